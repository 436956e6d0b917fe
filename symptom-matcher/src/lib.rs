//! Symptom matcher library
//!
//! Matches free-text symptom descriptions against a fixed table of medical
//! categories using TF-IDF + cosine similarity, per language (English, Hindi).

pub mod corpus;
pub mod language;
pub mod matcher;
pub mod vectorizer;

// Re-export main types
pub use corpus::{Category, Corpus, CorpusError};
pub use language::{Language, LanguageError, Localized};
pub use matcher::{
    CategoryScore, Classification, Match, MatchError, MatcherConfig, SymptomMatcher, TieBreak,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use vectorizer::{cosine, tokenize, SparseVector, TfidfIndex, VectorizerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
