//! Localized assistant notices.
//!
//! Fixed user-facing strings that are not category replies: the welcome
//! line, the fallback reply and system notices.

use symptom_matcher::Language;

/// Reply used when no category clears the confidence threshold
pub fn fallback_reply(language: Language) -> &'static str {
    match language {
        Language::English => {
            "I'm not sure I understand. Please describe symptoms like 'Fever', 'Headache', etc."
        }
        Language::Hindi => {
            "क्षमा करें, मुझे समझ नहीं आया। कृपया स्पष्ट रूप से बताएं (जैसे: 'मुझे बुखार है')."
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    /// Shown after switching; rendered in the new language
    LanguageSwitched,
    NoSpeech,
    Unintelligible,
    SpeechServiceFailed,
    SpeechServiceUnavailable,
    VoiceOutputFailed,
}

impl Notice {
    /// Text shown in the chat
    pub fn text(self, language: Language) -> &'static str {
        use Language::{English, Hindi};

        match (self, language) {
            (Notice::Welcome, English) => "Hello! How can I help you today?",
            (Notice::Welcome, Hindi) => "नमस्ते! आज मैं आपकी क्या मदद कर सकता हूँ?",

            (Notice::LanguageSwitched, English) => "Language switched to English",
            (Notice::LanguageSwitched, Hindi) => "Language switched to Hindi (हिंदी)",

            (Notice::NoSpeech, English) => "No speech detected.",
            (Notice::NoSpeech, Hindi) => "कोई आवाज़ सुनाई नहीं दी।",

            (Notice::Unintelligible, English) => "Could not understand audio.",
            (Notice::Unintelligible, Hindi) => "आवाज़ समझ नहीं आई।",

            (Notice::SpeechServiceFailed, English) => "Speech recognition failed. Please type instead.",
            (Notice::SpeechServiceFailed, Hindi) => "आवाज़ पहचान विफल रही। कृपया टाइप करें।",

            (Notice::SpeechServiceUnavailable, English) => {
                "Speech recognition is not configured. Please type instead."
            }
            (Notice::SpeechServiceUnavailable, Hindi) => {
                "आवाज़ पहचान सेट नहीं है। कृपया टाइप करें।"
            }

            (Notice::VoiceOutputFailed, English) => "Voice output failed; showing text only.",
            (Notice::VoiceOutputFailed, Hindi) => "आवाज़ आउटपुट विफल रहा; केवल पाठ दिखाया जा रहा है।",
        }
    }

    /// Text spoken aloud, if the notice is announced at all
    pub fn spoken(self, language: Language) -> Option<&'static str> {
        match (self, language) {
            (Notice::LanguageSwitched, Language::English) => Some("Language switched to English"),
            (Notice::LanguageSwitched, Language::Hindi) => Some("भाषा हिंदी में बदल दी गई है"),
            _ => None,
        }
    }
}
