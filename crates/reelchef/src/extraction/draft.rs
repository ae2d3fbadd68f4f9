//! The structured recipe draft produced by the model.
//!
//! Models are loose with types: quantities arrive as numbers or strings,
//! ingredients as plain strings or objects, steps as strings or `{text}`
//! objects. Deserialization accepts all of these and normalizes them; the
//! serialized form is the normalized one.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "ingredient_list")]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, deserialize_with = "text_list")]
    pub instructions: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub equipment: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub tips: Vec<String>,
    #[serde(default, deserialize_with = "opt_nutrition", skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl RecipeDraft {
    /// No title and nothing to cook from.
    pub fn is_hollow(&self) -> bool {
        self.title.is_none() && self.ingredients.is_empty() && self.instructions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,
}

impl Nutrition {
    fn is_empty(&self) -> bool {
        self.calories.is_none()
            && self.protein.is_none()
            && self.carbs.is_none()
            && self.fat.is_none()
            && self.servings.is_none()
    }
}

/// Text from a string, number or boolean. Blank strings count as absent.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| value.get(*k).and_then(value_text))
}

fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_text))
}

fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(single @ Value::String(_)) => vec![single],
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => field_text(item, &["text", "step", "instruction", "description", "name"]),
            other => value_text(other),
        })
        .collect())
}

fn ingredient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Ingredient>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => Some(Ingredient {
                name: field_text(item, &["name", "ingredient", "item"])?,
                quantity: field_text(item, &["quantity", "amount", "qty"]),
                unit: field_text(item, &["unit", "units"]),
                notes: field_text(item, &["notes", "note", "preparation"]),
            }),
            other => value_text(other).map(|name| Ingredient {
                name,
                ..Default::default()
            }),
        })
        .collect())
}

fn opt_nutrition<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Nutrition>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let Some(value @ Value::Object(_)) = value else {
        return Ok(None);
    };
    let nutrition = Nutrition {
        calories: field_text(&value, &["calories", "kcal"]),
        protein: field_text(&value, &["protein"]),
        carbs: field_text(&value, &["carbs", "carbohydrates"]),
        fat: field_text(&value, &["fat"]),
        servings: field_text(&value, &["servings", "serves"]),
    };
    Ok((!nutrition.is_empty()).then_some(nutrition))
}
