//! Language identification and target-language bucketing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use whatlang::Lang;

/// Shorter text gives the statistical detector too little signal.
const MIN_DETECTION_CHARS: usize = 20;

/// Languages recipes can be extracted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Nl,
    Pl,
    Ru,
    Uk,
    Tr,
    Ja,
    Ko,
    Zh,
    Ar,
    Hi,
}

impl Language {
    pub const ALL: [Language; 16] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
        Language::Nl,
        Language::Pl,
        Language::Ru,
        Language::Uk,
        Language::Tr,
        Language::Ja,
        Language::Ko,
        Language::Zh,
        Language::Ar,
        Language::Hi,
    ];

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Nl => "nl",
            Language::Pl => "pl",
            Language::Ru => "ru",
            Language::Uk => "uk",
            Language::Tr => "tr",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
            Language::Ar => "ar",
            Language::Hi => "hi",
        }
    }

    /// English name, as used in model prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Nl => "Dutch",
            Language::Pl => "Polish",
            Language::Ru => "Russian",
            Language::Uk => "Ukrainian",
            Language::Tr => "Turkish",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Zh => "Chinese",
            Language::Ar => "Arabic",
            Language::Hi => "Hindi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        // Accept regional tags such as `pt-BR` or `en_US`.
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        Self::ALL.into_iter().find(|l| l.code() == primary)
    }

    fn from_whatlang(lang: Lang) -> Option<Self> {
        match lang {
            Lang::Eng => Some(Language::En),
            Lang::Spa => Some(Language::Es),
            Lang::Fra => Some(Language::Fr),
            Lang::Deu => Some(Language::De),
            Lang::Ita => Some(Language::It),
            Lang::Por => Some(Language::Pt),
            Lang::Nld => Some(Language::Nl),
            Lang::Pol => Some(Language::Pl),
            Lang::Rus => Some(Language::Ru),
            Lang::Ukr => Some(Language::Uk),
            Lang::Tur => Some(Language::Tr),
            Lang::Jpn => Some(Language::Ja),
            Lang::Kor => Some(Language::Ko),
            Lang::Cmn => Some(Language::Zh),
            Lang::Ara => Some(Language::Ar),
            Lang::Hin => Some(Language::Hi),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("Unsupported language: {}", s))
    }
}

/// Best-guess language of `text`, or `None` when it is too short or not a
/// language recipes are extracted in.
pub fn detect(text: &str) -> Option<Language> {
    if text.trim().chars().count() < MIN_DETECTION_CHARS {
        return None;
    }
    whatlang::detect(text).and_then(|info| Language::from_whatlang(info.lang()))
}

/// Like [`detect`], but only when the detector considers its guess reliable.
pub fn detect_confident(text: &str) -> Option<Language> {
    if text.trim().chars().count() < MIN_DETECTION_CHARS {
        return None;
    }
    whatlang::detect(text)
        .filter(|info| info.is_reliable())
        .and_then(|info| Language::from_whatlang(info.lang()))
}

/// Language a caller asked the recipe to be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    /// Keep whatever language the video is in.
    Original,
    Language(Language),
}

impl TargetLanguage {
    pub const ORIGINAL_KEY: &'static str = "original";

    /// Key used for the raw extraction cache and for persisting the request.
    pub fn as_key(&self) -> &'static str {
        match self {
            TargetLanguage::Original => Self::ORIGINAL_KEY,
            TargetLanguage::Language(lang) => lang.code(),
        }
    }

    pub fn language(&self) -> Option<Language> {
        match self {
            TargetLanguage::Original => None,
            TargetLanguage::Language(lang) => Some(*lang),
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(Self::ORIGINAL_KEY) {
            return Ok(TargetLanguage::Original);
        }
        s.parse().map(TargetLanguage::Language)
    }
}

impl Serialize for TargetLanguage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_key())
    }
}

impl<'de> Deserialize<'de> for TargetLanguage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Cache bucket for an extraction.
///
/// Asking to keep the original language of a video that is already in the
/// default language yields exactly what an explicit default-language
/// request yields, so both share the default bucket. Every other request
/// is its own bucket.
pub fn effective_target(
    requested: TargetLanguage,
    detected: Option<Language>,
    default: Language,
) -> TargetLanguage {
    match (requested, detected) {
        (TargetLanguage::Original, Some(lang)) if lang == default => {
            TargetLanguage::Language(default)
        }
        _ => requested,
    }
}

/// Language hint passed to the transcript provider.
///
/// A default-language request always asks for the default language. A
/// keep-original request uses the caption's language when it can be
/// detected with confidence. Anything else lets the provider choose.
pub fn transcript_hint(
    requested: TargetLanguage,
    description: Option<&str>,
    default: Language,
) -> Option<Language> {
    match requested {
        TargetLanguage::Language(lang) if lang == default => Some(default),
        TargetLanguage::Original => description.and_then(detect_confident),
        TargetLanguage::Language(_) => None,
    }
}
