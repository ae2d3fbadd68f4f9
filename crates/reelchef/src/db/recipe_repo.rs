//! Recipe repository. Each successful job writes exactly one row.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw recipe row. List columns hold JSON arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRow {
    pub id: String,
    pub user_id: String,
    pub job_id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: String,
    pub language: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: String,
    pub instructions: String,
    pub equipment: String,
    pub tips: String,
    pub nutrition: Option<String>,
    pub confidence: f64,
    pub thumbnail_url: Option<String>,
    pub author_id: Option<i64>,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub created_at: String,
}

impl RecipeRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            job_id: row.get("job_id")?,
            source_url: row.get("source_url")?,
            normalized_url: row.get("normalized_url")?,
            platform: row.get("platform")?,
            language: row.get("language")?,
            title: row.get("title")?,
            description: row.get("description")?,
            ingredients: row.get("ingredients")?,
            instructions: row.get("instructions")?,
            equipment: row.get("equipment")?,
            tips: row.get("tips")?,
            nutrition: row.get("nutrition")?,
            confidence: row.get("confidence")?,
            thumbnail_url: row.get("thumbnail_url")?,
            author_id: row.get("author_id")?,
            author_username: row.get("author_username")?,
            author_display_name: row.get("author_display_name")?,
            author_avatar_url: row.get("author_avatar_url")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts on an already locked connection, so the write can share a
/// transaction with the job's completion.
pub(crate) fn insert_on(conn: &Connection, recipe: &RecipeRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO recipes (id, user_id, job_id, source_url, normalized_url, platform,
         language, title, description, ingredients, instructions, equipment, tips,
         nutrition, confidence, thumbnail_url, author_id, author_username,
         author_display_name, author_avatar_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21)",
        params![
            recipe.id,
            recipe.user_id,
            recipe.job_id,
            recipe.source_url,
            recipe.normalized_url,
            recipe.platform,
            recipe.language,
            recipe.title,
            recipe.description,
            recipe.ingredients,
            recipe.instructions,
            recipe.equipment,
            recipe.tips,
            recipe.nutrition,
            recipe.confidence,
            recipe.thumbnail_url,
            recipe.author_id,
            recipe.author_username,
            recipe.author_display_name,
            recipe.author_avatar_url,
            recipe.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RecipeRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM recipes WHERE id = ?1",
                params![id],
                RecipeRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Most recent recipe a user saved from the given source.
pub fn find_latest_for_source(
    db: &Database,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<RecipeRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM recipes WHERE user_id = ?1 AND normalized_url = ?2
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![user_id, normalized_url],
                RecipeRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn count_for_user(db: &Database, user_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
