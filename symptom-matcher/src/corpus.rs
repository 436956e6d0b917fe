//! Category table for the symptom matcher
//!
//! The corpus is fixed at construction. Each category is one "document" per
//! language for the TF-IDF index, and carries the canned reply for a match.

use crate::language::{Language, Localized};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Corpus errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorpusError {
    #[error("Corpus is empty: at least one category is required")]
    Empty,

    #[error("Category id must not be empty (position {0})")]
    EmptyId(usize),

    #[error("Duplicate category id: {0}")]
    DuplicateId(String),
}

/// A symptom category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable key, e.g. "fever"
    pub id: String,

    /// Bag of keywords/phrases, one string per language
    pub patterns: Localized<String>,

    /// Canned reply, one string per language
    pub response: Localized<String>,
}

impl Category {
    pub fn new(
        id: impl Into<String>,
        patterns: Localized<String>,
        response: Localized<String>,
    ) -> Self {
        Self {
            id: id.into(),
            patterns,
            response,
        }
    }

    /// Pattern string for one language
    pub fn pattern(&self, language: Language) -> &str {
        self.patterns.get(language)
    }

    /// Reply text for one language
    pub fn reply(&self, language: Language) -> &str {
        self.response.get(language)
    }
}

/// Builtin rows: (id, en patterns, hi patterns, en reply, hi reply)
const BUILTIN_CATEGORIES: [(&str, &str, &str, &str, &str); 6] = [
    (
        "greeting",
        "hello hi hey doctor good morning good evening help me wake up",
        "नमस्ते हेलो डॉक्टर मदद करो कैसे हो सुप्रभात",
        "Hello! I am Dr. AI. I am ready to help. Please describe your symptoms.",
        "नमस्ते! मैं डॉ. एआई हूँ। बताईये आपको क्या समस्या हो रही है?",
    ),
    (
        "fever",
        "i have fever high temperature body is burning shivering feeling hot cold chills thermometer reads high",
        "मुझे बुखार है मेरा शरीर गरम है कंपकंपी हो रही है तापमान ज्यादा है ठंड लग रही है",
        "Diagnosis: Viral Fever.\nRx: Take Paracetamol 650mg, use a cold sponge on your forehead, and drink plenty of fluids.",
        "निदान: वायरल बुखार।\nइलाज: पैरासिटामोल 650mg लें, माथे पर गीली पट्टी रखें और खूब पानी पिएं।",
    ),
    (
        "cold",
        "running nose sneezing cough sore throat blocked nose mucus phlegm congestion flu",
        "नाक बह रही है छींक आ रही है खांसी है गला खराब है जुकाम है बलगम",
        "Diagnosis: Common Cold.\nRx: Steam inhalation 3 times a day. Gargle with salt water. Drink warm turmeric milk.",
        "निदान: सामान्य सर्दी।\nइलाज: दिन में 3 बार भाप लें। नमक के पानी से गरारे करें। हल्दी वाला दूध पिएं।",
    ),
    (
        "stomach",
        "stomach pain belly ache loose motions diarrhea vomiting acidity gas burning sensation digestion problem food poisoning",
        "पेट में दर्द है दस्त लगे हैं उल्टी हो रही है गैस बन रही है पेट खराब है एसिडिटी",
        "Diagnosis: Gastric Issue.\nRx: Eat light food (Curd-Rice/Toast). Drink ORS solution. Avoid spicy and oily food.",
        "निदान: पेट की समस्या।\nइलाज: हल्का खाना (दही-चावल) खाएं। ORS का घोल पिएं। मसालेदार खाने से बचें।",
    ),
    (
        "headache",
        "headache splitting head pain migraine dizzy heavy head stress tension",
        "सिर दर्द कर रहा है सिर भारी है माइग्रेन चक्कर आ रहे हैं तनाव",
        "Diagnosis: Tension Headache.\nRx: Drink a large glass of water immediately. Rest in a dark, quiet room. Stay off screens.",
        "निदान: सिरदर्द।\nइलाज: तुरंत एक गिलास पानी पिएं। अंधेरे और शांत कमरे में आराम करें। फोन का इस्तेमाल न करें।",
    ),
    (
        "thanks",
        "thank you thanks bye goodbye see you exit quit",
        "धन्यवाद शुक्रिया बाय अलविदा टाटा",
        "You're welcome! Take care of your health. Goodbye!",
        "स्वागत है! अपनी सेहत का ख्याल रखें। अलविदा!",
    ),
];

/// Immutable, ordered set of categories
///
/// Table order matters: it is the tie-break order of the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    categories: Vec<Category>,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Corpus {
    /// Validate and wrap a category table
    pub fn new(categories: Vec<Category>) -> Result<Self, CorpusError> {
        if categories.is_empty() {
            return Err(CorpusError::Empty);
        }

        let mut seen = HashSet::new();
        for (position, category) in categories.iter().enumerate() {
            if category.id.trim().is_empty() {
                return Err(CorpusError::EmptyId(position));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(CorpusError::DuplicateId(category.id.clone()));
            }
        }

        Ok(Self { categories })
    }

    /// The reference category table (6 categories)
    pub fn builtin() -> Self {
        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|(id, patterns_en, patterns_hi, response_en, response_hi)| {
                Category::new(
                    *id,
                    Localized::new(patterns_en.to_string(), patterns_hi.to_string()),
                    Localized::new(response_en.to_string(), response_hi.to_string()),
                )
            })
            .collect();

        Self { categories }
    }

    /// Categories in table order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category at a table position
    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    /// Lookup by id
    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Category ids in table order
    pub fn ids(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.id.as_str()).collect()
    }

    /// One pattern string per category for a language (the TF-IDF documents)
    pub fn documents(&self, language: Language) -> Vec<&str> {
        self.categories.iter().map(|c| c.pattern(language)).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
