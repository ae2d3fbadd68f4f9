//! Shared test utilities for reelchef integration tests.
//!
//! This module provides:
//! - Recording fakes for every external collaborator
//! - `TestHarness`, a full `ExtractionService` over an in-memory database

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;

/// An English cooking transcript long enough for language detection.
pub const ENGLISH_TRANSCRIPT: &str = "Today I am making my favourite garlic butter noodles. \
    Boil the noodles for eight minutes, then melt two tablespoons of butter in a pan, \
    add four cloves of minced garlic and cook until fragrant. Toss the noodles in the \
    pan with a splash of soy sauce and finish with chopped spring onions.";

pub const SPANISH_TRANSCRIPT: &str = "Hoy vamos a preparar una tortilla de patatas muy sencilla. \
    Pela y corta las patatas en rodajas finas, fríelas en abundante aceite de oliva a fuego \
    medio, bate seis huevos con una pizca de sal y mezcla todo antes de cuajar la tortilla \
    por ambos lados en una sartén.";

pub const RECIPE_REPLY: &str = r#"{
    "isRecipe": true,
    "confidence": 0.92,
    "title": "Garlic butter noodles",
    "ingredients": [
        {"name": "noodles"},
        {"name": "butter", "quantity": "2", "unit": "tbsp"},
        {"name": "garlic", "quantity": "4", "unit": "cloves", "notes": "minced"},
        {"name": "soy sauce"},
        {"name": "spring onions", "notes": "chopped"}
    ],
    "instructions": [
        "Boil the noodles for 8 minutes.",
        "Melt the butter and cook the garlic until fragrant.",
        "Toss the noodles with the garlic butter and soy sauce.",
        "Top with spring onions."
    ],
    "equipment": ["pan", "pot"],
    "tips": []
}"#;

pub const NOT_A_RECIPE_REPLY: &str = r#"{"isRecipe": false, "reason": "dance video"}"#;

pub const SHORTS_URL: &str = "https://www.youtube.com/shorts/abc123DEF45";
pub const TIKTOK_URL: &str = "https://www.tiktok.com/@noodlechef/video/7301234567890123456";
