//! Prompts for recipe extraction.
//!
//! The system prompt lives in `prompt.txt` and is embedded at compile time.

use crate::language::{Language, TargetLanguage};
use crate::link::Platform;

pub const RECIPE_EXTRACTION_PROMPT: &str = include_str!("prompt.txt");

const LANGUAGE_PLACEHOLDER: &str = "{{LANGUAGE_RULE}}";

/// System prompt for one extraction, with the output-language rule filled in.
pub fn build_extraction_prompt(target: TargetLanguage, detected: Option<Language>) -> String {
    let rule = match (target, detected) {
        (TargetLanguage::Language(lang), _) => format!(
            "Write every text field in {name}. Translate from the source language when needed, \
             but keep the JSON keys in English.",
            name = lang.name()
        ),
        (TargetLanguage::Original, Some(lang)) => format!(
            "The video is in {name}. Write every text field in {name}. Do not translate anything, \
             keep the creator's wording and keep the JSON keys in English.",
            name = lang.name()
        ),
        (TargetLanguage::Original, None) => "Write every text field in the language the creator \
             speaks in the transcript. Do not translate anything and keep the JSON keys in English."
            .to_string(),
    };
    RECIPE_EXTRACTION_PROMPT.replace(LANGUAGE_PLACEHOLDER, &rule)
}

/// User message carrying the video context and transcript.
pub fn build_user_message(
    platform: Platform,
    source_url: &str,
    description: Option<&str>,
    transcript: &str,
) -> String {
    let mut message = format!(
        "Platform: {}\nVideo: {}\n",
        platform.display_name(),
        source_url
    );
    if let Some(caption) = description.map(str::trim).filter(|c| !c.is_empty()) {
        message.push_str("\nCaption:\n");
        message.push_str(caption);
        message.push('\n');
    }
    message.push_str("\nTranscript:\n");
    message.push_str(transcript.trim());
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_embedded() {
        assert!(RECIPE_EXTRACTION_PROMPT.contains("isRecipe"));
        assert!(RECIPE_EXTRACTION_PROMPT.contains("Never invent quantities"));
        assert!(RECIPE_EXTRACTION_PROMPT.contains(LANGUAGE_PLACEHOLDER));
    }

    #[test]
    fn test_translation_rule() {
        let prompt = build_extraction_prompt(TargetLanguage::Language(Language::De), Some(Language::En));
        assert!(prompt.contains("Write every text field in German"));
        assert!(prompt.contains("Translate"));
        assert!(!prompt.contains(LANGUAGE_PLACEHOLDER));
    }

    #[test]
    fn test_original_rule_preserves_language() {
        let prompt = build_extraction_prompt(TargetLanguage::Original, Some(Language::Es));
        assert!(prompt.contains("The video is in Spanish"));
        assert!(prompt.contains("Do not translate"));

        let unknown = build_extraction_prompt(TargetLanguage::Original, None);
        assert!(unknown.contains("language the creator"));
    }

    #[test]
    fn test_user_message() {
        let message = build_user_message(
            Platform::Tiktok,
            "https://www.tiktok.com/@chef/video/1",
            Some("  Garlic noodles  "),
            "First boil the noodles.",
        );
        assert!(message.starts_with("Platform: TikTok\n"));
        assert!(message.contains("Caption:\nGarlic noodles\n"));
        assert!(message.ends_with("Transcript:\nFirst boil the noodles."));

        let bare = build_user_message(Platform::Youtube, "https://youtu.be/x", Some(" "), "t");
        assert!(!bare.contains("Caption"));
    }
}
