//! Transcript-to-recipe extraction behind the raw extraction cache.

pub mod draft;
mod extractor;
mod parse;

pub use draft::{Ingredient, Nutrition, RecipeDraft};
pub use extractor::{ExtractionInput, ExtractionOutcome, RecipeExtractor};
pub use parse::{parse_model_output, ParsedDraft, DEFAULT_NOT_A_RECIPE};
