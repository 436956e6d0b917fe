//! TF-IDF vectorizer module
//!
//! Builds a vector space over a small set of documents (one per category) and
//! projects free text into it. Weighting follows the common smoothed scheme:
//!
//! - tf: raw term count
//! - idf: ln((1 + n) / (1 + df)) + 1
//! - vectors are L2-normalized, so cosine similarity is a plain dot product

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Tokens are runs of two or more Unicode word characters.
/// Combining marks count as word characters, so Devanagari words stay whole.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is a valid regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VectorizerError {
    #[error("No documents to index")]
    NoDocuments,

    #[error("Empty vocabulary: documents contain no tokens")]
    EmptyVocabulary,
}

/// Lowercase and split text into tokens
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Sparse, L2-normalized term vector (entries sorted by term id)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Build from raw weights, normalizing to unit length.
    /// An all-zero input yields the zero vector.
    fn normalized(weights: HashMap<usize, f64>) -> Self {
        // Sort before summing so the norm is bit-identical across instances
        let mut entries: Vec<(usize, f64)> = weights.into_iter().collect();
        entries.sort_unstable_by_key(|(term, _)| *term);

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Self::default();
        }

        for (_, weight) in &mut entries {
            *weight /= norm;
        }

        Self { entries }
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-zero terms
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Euclidean length (1.0 or 0.0 by construction)
    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }
}

/// Cosine similarity between two normalized vectors
///
/// Merge-walks the sorted entries. Returns 0.0 if either side is zero.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;

    while i < a.entries.len() && j < b.entries.len() {
        let (ta, wa) = a.entries[i];
        let (tb, wb) = b.entries[j];
        match ta.cmp(&tb) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += wa * wb;
                i += 1;
                j += 1;
            }
        }
    }

    // Guard against rounding pushing identical vectors past 1.0
    dot.clamp(0.0, 1.0)
}

/// Fitted TF-IDF index over a fixed document set
#[derive(Debug, Clone)]
pub struct TfidfIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: Vec<SparseVector>,
}

impl TfidfIndex {
    /// Fit the index on a document set
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self, VectorizerError> {
        if documents.is_empty() {
            return Err(VectorizerError::NoDocuments);
        }

        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        // Vocabulary ids in first-seen order keep the index deterministic
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();

        for tokens in &tokenized {
            let mut seen_in_doc: Vec<usize> = Vec::new();
            for token in tokens {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                if id == document_frequency.len() {
                    document_frequency.push(0);
                }
                if !seen_in_doc.contains(&id) {
                    seen_in_doc.push(id);
                    document_frequency[id] += 1;
                }
            }
        }

        if vocabulary.is_empty() {
            return Err(VectorizerError::EmptyVocabulary);
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut index = Self {
            vocabulary,
            idf,
            documents: Vec::with_capacity(tokenized.len()),
        };

        index.documents = tokenized
            .iter()
            .map(|tokens| index.weigh(tokens))
            .collect();

        debug!(
            "Fitted TF-IDF index: {} documents, {} terms",
            index.documents.len(),
            index.vocabulary.len()
        );

        Ok(index)
    }

    /// Project free text into the index space.
    /// Terms unseen at fit time carry no weight.
    pub fn project(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        let vector = self.weigh(&tokens);
        trace!(
            "Projected {} tokens onto {} known terms",
            tokens.len(),
            vector.nnz()
        );
        vector
    }

    /// Cosine similarity of a text against every document, in document order
    pub fn similarities(&self, text: &str) -> Vec<f64> {
        let query = self.project(text);
        self.documents.iter().map(|doc| cosine(&query, doc)).collect()
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut weights: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&term) = self.vocabulary.get(token) {
                *weights.entry(term).or_insert(0.0) += self.idf[term];
            }
        }
        SparseVector::normalized(weights)
    }

    /// Document vector at a position
    pub fn document(&self, index: usize) -> Option<&SparseVector> {
        self.documents.get(index)
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Whether a term was seen at fit time
    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Inverse document frequency of a term, if known
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&id| self.idf[id])
    }
}
