use serde::Deserialize;
use serde_json::Value;

use super::draft::RecipeDraft;
use crate::error::ExtractionError;

pub const DEFAULT_NOT_A_RECIPE: &str =
    "This video doesn't seem to contain a recipe. Try a video that shows how a dish is made.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelResponse {
    #[serde(default)]
    is_recipe: Option<Value>,
    #[serde(default)]
    reason: Option<Value>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(flatten)]
    draft: RecipeDraft,
}

/// A usable draft and how far to trust it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDraft {
    pub draft: RecipeDraft,
    pub confidence: f64,
}

/// Interprets a raw model reply.
///
/// Tolerates Markdown fences and chatter around the JSON object. A reply
/// flagged as not a recipe, or with no title and nothing to cook from, is
/// rejected.
pub fn parse_model_output(raw: &str) -> Result<ParsedDraft, ExtractionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let json = json_object_slice(trimmed).ok_or_else(|| {
        ExtractionError::MalformedResponse("no JSON object in model reply".to_string())
    })?;
    let response: ModelResponse = serde_json::from_str(json)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

    if is_false(response.is_recipe.as_ref()) {
        let reason = response
            .reason
            .as_ref()
            .and_then(super::draft::value_text)
            .unwrap_or_else(|| DEFAULT_NOT_A_RECIPE.to_string());
        return Err(ExtractionError::NotARecipe(reason));
    }

    if response.draft.is_hollow() {
        return Err(ExtractionError::NotARecipe(DEFAULT_NOT_A_RECIPE.to_string()));
    }

    let confidence = response
        .confidence
        .as_ref()
        .and_then(number)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or_else(|| estimate_confidence(&response.draft));

    Ok(ParsedDraft {
        draft: response.draft,
        confidence,
    })
}

fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn is_false(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("false"),
        _ => false,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().map(|v| {
            if s.contains('%') {
                v / 100.0
            } else {
                v
            }
        }),
        _ => None,
    }
}

/// Used when the model does not report a confidence.
fn estimate_confidence(draft: &RecipeDraft) -> f64 {
    let mut score: f64 = 0.3;
    if draft.title.is_some() {
        score += 0.1;
    }
    if !draft.ingredients.is_empty() {
        score += 0.2;
    }
    if !draft.instructions.is_empty() {
        score += 0.2;
    }
    if draft.ingredients.iter().any(|i| i.quantity.is_some()) {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}
