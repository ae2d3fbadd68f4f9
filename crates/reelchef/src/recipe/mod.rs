//! Persisted recipes and their assembly from extraction drafts.

mod assembler;

pub use assembler::RecipeAssembler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::recipe_repo::RecipeRow;
use crate::db::{from_json_column, DatabaseError};
use crate::extraction::{Ingredient, Nutrition};
use crate::link::Platform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeAuthor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A recipe owned by the user whose job produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub user_id: String,
    pub job_id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub equipment: Vec<String>,
    pub tips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<RecipeAuthor>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn from_row(row: RecipeRow) -> Result<Self, DatabaseError> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::invalid_column("created_at", e))?;
        let nutrition = row
            .nutrition
            .as_deref()
            .map(|raw| from_json_column("nutrition", raw))
            .transpose()?;
        let author = row.author_username.map(|username| RecipeAuthor {
            id: row.author_id,
            username,
            display_name: row.author_display_name,
            avatar_url: row.author_avatar_url,
        });

        Ok(Self {
            platform: row.platform.parse().unwrap_or(Platform::Other),
            ingredients: from_json_column("ingredients", &row.ingredients)?,
            instructions: from_json_column("instructions", &row.instructions)?,
            equipment: from_json_column("equipment", &row.equipment)?,
            tips: from_json_column("tips", &row.tips)?,
            nutrition,
            author,
            created_at,
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            source_url: row.source_url,
            normalized_url: row.normalized_url,
            language: row.language,
            title: row.title,
            description: row.description,
            confidence: row.confidence,
            thumbnail_url: row.thumbnail_url,
        })
    }
}
