//! Query matcher module
//!
//! Finds the category whose pattern string is most similar to a free-text
//! query and reports whether the match clears the confidence threshold.

use crate::corpus::Corpus;
use crate::language::{Language, Localized};
use crate::vectorizer::{TfidfIndex, VectorizerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Minimum cosine similarity (0.0 - 1.0) for a confident match
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Cannot index {language} patterns: {source}")]
    Index {
        language: Language,
        #[source]
        source: VectorizerError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// How to choose between categories with equal best score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earliest category in table order
    #[default]
    FirstInTable,

    /// Latest category in table order
    LastInTable,
}

/// Matcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Scores below this are reported as unmatched
    pub confidence_threshold: f64,

    /// Tie-break rule for equal best scores
    pub tie_break: TieBreak,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            tie_break: TieBreak::FirstInTable,
        }
    }
}

impl MatcherConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), MatchError> {
        let t = self.confidence_threshold;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(MatchError::InvalidConfig(format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                t
            )));
        }
        Ok(())
    }
}

/// A confident match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub category_id: String,
    pub response: String,
    pub score: f64,
}

/// Outcome of classifying one query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Classification {
    /// Best score cleared the threshold
    Matched(Match),

    /// No category was similar enough
    Unmatched { best_score: f64 },
}

impl Classification {
    pub fn is_matched(&self) -> bool {
        matches!(self, Classification::Matched(_))
    }

    /// Reply text when matched
    pub fn response(&self) -> Option<&str> {
        match self {
            Classification::Matched(m) => Some(&m.response),
            Classification::Unmatched { .. } => None,
        }
    }

    /// Category id when matched
    pub fn category_id(&self) -> Option<&str> {
        match self {
            Classification::Matched(m) => Some(&m.category_id),
            Classification::Unmatched { .. } => None,
        }
    }

    /// Best similarity score, matched or not
    pub fn score(&self) -> f64 {
        match self {
            Classification::Matched(m) => m.score,
            Classification::Unmatched { best_score } => *best_score,
        }
    }
}

/// Similarity of one category to a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category_id: String,
    pub score: f64,
}

/// Symptom matcher: one read-only TF-IDF index per language
#[derive(Debug)]
pub struct SymptomMatcher {
    corpus: Corpus,
    indexes: Localized<TfidfIndex>,
    config: MatcherConfig,
}

impl SymptomMatcher {
    /// Build the per-language indexes for a corpus
    pub fn new(corpus: Corpus, config: MatcherConfig) -> Result<Self, MatchError> {
        config.validate()?;

        let indexes = Localized::try_from_fn(|language| {
            TfidfIndex::fit(&corpus.documents(language))
                .map_err(|source| MatchError::Index { language, source })
        })?;

        info!(
            "Symptom matcher ready: {} categories, vocabulary en={} hi={}, threshold={}",
            corpus.len(),
            indexes.en.vocabulary_size(),
            indexes.hi.vocabulary_size(),
            config.confidence_threshold
        );

        Ok(Self {
            corpus,
            indexes,
            config,
        })
    }

    /// Matcher over the builtin corpus with default configuration
    pub fn builtin() -> Result<Self, MatchError> {
        Self::new(Corpus::builtin(), MatcherConfig::default())
    }

    /// Classify a query in a language
    pub fn classify(&self, query: &str, language: Language) -> Result<Classification, MatchError> {
        if query.trim().is_empty() {
            return Err(MatchError::EmptyQuery);
        }

        let scores = self.indexes[language].similarities(query);
        let (best_index, best_score) = self.select_best(&scores);

        if best_score < self.config.confidence_threshold {
            debug!(
                "No confident match ({}): best={:.3} < threshold={}",
                language, best_score, self.config.confidence_threshold
            );
            return Ok(Classification::Unmatched { best_score });
        }

        // One score per category, and a corpus is never empty
        let category = &self.corpus.categories()[best_index];

        debug!(
            "Matched '{}' ({}) with score {:.3}",
            category.id, language, best_score
        );

        Ok(Classification::Matched(Match {
            category_id: category.id.clone(),
            response: category.reply(language).to_string(),
            score: best_score,
        }))
    }

    /// Score every category, best first (ties keep table order)
    pub fn rank(&self, query: &str, language: Language) -> Result<Vec<CategoryScore>, MatchError> {
        if query.trim().is_empty() {
            return Err(MatchError::EmptyQuery);
        }

        let scores = self.indexes[language].similarities(query);
        let mut ranked: Vec<CategoryScore> = self
            .corpus
            .categories()
            .iter()
            .zip(scores)
            .map(|(category, score)| CategoryScore {
                category_id: category.id.clone(),
                score,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }

    fn select_best(&self, scores: &[f64]) -> (usize, f64) {
        let mut best = (0, f64::NEG_INFINITY);
        for (i, &score) in scores.iter().enumerate() {
            let better = match self.config.tie_break {
                TieBreak::FirstInTable => score > best.1,
                TieBreak::LastInTable => score >= best.1,
            };
            if better {
                best = (i, score);
            }
        }
        best
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Read-only index for one language
    pub fn index(&self, language: Language) -> &TfidfIndex {
        &self.indexes[language]
    }
}
