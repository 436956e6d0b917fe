//! Integration tests for the symptom matcher
//!
//! Exercises the builtin corpus end to end in both languages.

use symptom_matcher::{
    Category, Classification, Corpus, CorpusError, Language, Localized, MatcherConfig,
    SymptomMatcher, DEFAULT_CONFIDENCE_THRESHOLD,
};
use test_case::test_case;

fn matcher() -> SymptomMatcher {
    SymptomMatcher::builtin().expect("builtin corpus must index")
}

#[test_case("I have a fever and chills", "fever", "Diagnosis: Viral Fever." ; "fever_and_chills")]
#[test_case("my stomach hurts and I have diarrhea", "stomach", "Diagnosis: Gastric Issue." ; "stomach_and_diarrhea")]
#[test_case("thank you doctor, goodbye", "thanks", "You're welcome!" ; "thanks_goodbye")]
#[test_case("hello", "greeting", "Hello! I am Dr. AI." ; "hello")]
#[test_case("cough and a blocked nose", "cold", "Diagnosis: Common Cold." ; "blocked_nose")]
#[test_case("splitting headache", "headache", "Diagnosis: Tension Headache." ; "headache")]
fn test_english_scenarios(query: &str, expected_id: &str, expected_prefix: &str) {
    let result = matcher().classify(query, Language::English).unwrap();

    assert_eq!(result.category_id(), Some(expected_id));
    let response = result.response().unwrap();
    assert!(
        response.starts_with(expected_prefix),
        "response {:?} does not start with {:?}",
        response,
        expected_prefix
    );
}

#[test_case("मुझे सिर दर्द हो रहा है", "headache", "निदान: सिरदर्द।" ; "headache")]
#[test_case("मुझे बुखार है", "fever", "निदान: वायरल बुखार।" ; "fever")]
#[test_case("धन्यवाद", "thanks", "स्वागत है!" ; "thanks")]
fn test_hindi_scenarios(query: &str, expected_id: &str, expected_prefix: &str) {
    let result = matcher().classify(query, Language::Hindi).unwrap();

    assert_eq!(result.category_id(), Some(expected_id));
    assert!(result.response().unwrap().starts_with(expected_prefix));
}

#[test]
fn test_gibberish_is_unmatched() {
    let result = matcher()
        .classify("xyz completely unrelated gibberish", Language::English)
        .unwrap();

    assert_eq!(result, Classification::Unmatched { best_score: 0.0 });
}

#[test]
fn test_self_recognition_in_every_language() {
    let matcher = matcher();

    for language in Language::ALL {
        for category in matcher.corpus().categories() {
            let result = matcher.classify(category.pattern(language), language).unwrap();
            assert_eq!(
                result.category_id(),
                Some(category.id.as_str()),
                "{} pattern of '{}' not recognized",
                language,
                category.id
            );
            assert_eq!(result.response(), Some(category.reply(language)));
        }
    }
}

#[test]
fn test_classification_is_deterministic() {
    let first = matcher();
    let second = matcher();

    for query in ["I have a fever and chills", "stress and dizzy", "nothing relevant"] {
        let a = first.classify(query, Language::English).unwrap();
        let b = first.classify(query, Language::English).unwrap();
        let c = second.classify(query, Language::English).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }
}

#[test]
fn test_languages_use_only_their_own_corpus() {
    let matcher = matcher();

    // Hindi text has no overlap with the English vocabulary and vice versa
    let hindi_query = "मुझे सिर दर्द हो रहा है";
    assert!(!matcher.classify(hindi_query, Language::English).unwrap().is_matched());
    assert!(matcher.classify(hindi_query, Language::Hindi).unwrap().is_matched());

    let english_query = "I have a fever and chills";
    assert!(!matcher.classify(english_query, Language::Hindi).unwrap().is_matched());

    // Classifying in one language leaves the other index untouched
    let vocab_en = matcher.index(Language::English).vocabulary_size();
    let vocab_hi = matcher.index(Language::Hindi).vocabulary_size();
    let _ = matcher.classify(english_query, Language::English).unwrap();
    let _ = matcher.classify(hindi_query, Language::Hindi).unwrap();
    assert_eq!(matcher.index(Language::English).vocabulary_size(), vocab_en);
    assert_eq!(matcher.index(Language::Hindi).vocabulary_size(), vocab_hi);
}

#[test]
fn test_default_threshold_boundary_on_builtin_corpus() {
    let matcher = matcher();
    assert_eq!(matcher.config().confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);

    // Best score ~0.18 (stomach): just under the threshold
    let below = matcher.classify("ache fever", Language::English).unwrap();
    assert!(below.score() > 0.15 && below.score() < DEFAULT_CONFIDENCE_THRESHOLD);
    assert!(!below.is_matched());

    // Best score ~0.23 (headache): just over the threshold
    let above = matcher.classify("burning migraine", Language::English).unwrap();
    assert!(above.score() >= DEFAULT_CONFIDENCE_THRESHOLD && above.score() < 0.25);
    assert_eq!(above.category_id(), Some("headache"));
}

#[test]
fn test_score_equal_to_threshold_is_a_match() {
    let query = "burning migraine";
    let score = matcher().classify(query, Language::English).unwrap().score();

    let at = SymptomMatcher::new(
        Corpus::builtin(),
        MatcherConfig {
            confidence_threshold: score,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(at.classify(query, Language::English).unwrap().is_matched());

    let above = SymptomMatcher::new(
        Corpus::builtin(),
        MatcherConfig {
            confidence_threshold: score + 1e-9,
            ..Default::default()
        },
    )
    .unwrap();
    let result = above.classify(query, Language::English).unwrap();
    assert!(!result.is_matched());
    assert_eq!(result.score(), score);
}

#[test]
fn test_zero_threshold_still_reports_best_category() {
    let matcher = SymptomMatcher::new(
        Corpus::builtin(),
        MatcherConfig {
            confidence_threshold: 0.0,
            ..Default::default()
        },
    )
    .unwrap();

    // Every score is zero, so the first category in table order wins
    let result = matcher.classify("qwerty", Language::English).unwrap();
    assert_eq!(result.category_id(), Some("greeting"));
}

#[test]
fn test_empty_corpus_fails_fast() {
    assert_eq!(Corpus::new(Vec::new()), Err(CorpusError::Empty));
}

#[test]
fn test_custom_corpus() {
    let corpus = Corpus::new(vec![
        Category::new(
            "allergy",
            Localized::new(
                "itchy eyes rash allergy pollen".to_string(),
                "खुजली एलर्जी चकत्ते".to_string(),
            ),
            Localized::new(
                "Diagnosis: Allergy.".to_string(),
                "निदान: एलर्जी।".to_string(),
            ),
        ),
        Category::new(
            "injury",
            Localized::new(
                "cut wound bleeding sprain".to_string(),
                "चोट घाव खून मोच".to_string(),
            ),
            Localized::new(
                "Diagnosis: Minor Injury.".to_string(),
                "निदान: मामूली चोट।".to_string(),
            ),
        ),
    ])
    .unwrap();

    let matcher = SymptomMatcher::new(corpus, MatcherConfig::default()).unwrap();

    let result = matcher.classify("my eyes are itchy", Language::English).unwrap();
    assert_eq!(result.category_id(), Some("allergy"));

    let result = matcher.classify("घाव से खून", Language::Hindi).unwrap();
    assert_eq!(result.response(), Some("निदान: मामूली चोट।"));
}
