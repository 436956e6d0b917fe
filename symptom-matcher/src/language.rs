//! Language selection module
//!
//! Every category carries its patterns and replies in each supported language.
//! `Localized` keeps one value per language so the category count and ids can
//! never drift apart between languages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    #[error("Unsupported language: {0} (expected en or hi)")]
    Unsupported(String),
}

/// Supported conversation languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en", alias = "english")]
    English,

    #[serde(rename = "hi", alias = "hindi")]
    Hindi,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 2] = [Language::English, Language::Hindi];

    /// ISO 639-1 code
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    /// Locale tag used by speech services (Indian English / Hindi)
    pub fn speech_locale(self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
        }
    }

    /// Human readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi (हिंदी)",
        }
    }

    /// The other language
    pub fn toggled(self) -> Language {
        match self {
            Language::English => Language::Hindi,
            Language::Hindi => Language::English,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            other => Err(LanguageError::Unsupported(other.to_string())),
        }
    }
}

/// One value per supported language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized<T> {
    pub en: T,
    pub hi: T,
}

impl<T> Localized<T> {
    pub fn new(en: T, hi: T) -> Self {
        Self { en, hi }
    }

    /// Value for the given language
    pub fn get(&self, language: Language) -> &T {
        match language {
            Language::English => &self.en,
            Language::Hindi => &self.hi,
        }
    }

    /// Build a value for every language
    pub fn from_fn(mut f: impl FnMut(Language) -> T) -> Self {
        Self {
            en: f(Language::English),
            hi: f(Language::Hindi),
        }
    }

    /// Fallible variant of `from_fn`
    pub fn try_from_fn<E>(mut f: impl FnMut(Language) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            en: f(Language::English)?,
            hi: f(Language::Hindi)?,
        })
    }
}

impl<T> std::ops::Index<Language> for Localized<T> {
    type Output = T;

    fn index(&self, language: Language) -> &T {
        self.get(language)
    }
}
