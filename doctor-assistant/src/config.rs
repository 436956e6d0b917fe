//! Assistant configuration
//!
//! Loaded from an optional YAML file, then overridden by `DOCTOR_*`
//! environment variables, then validated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symptom_matcher::{Language, MatcherConfig};
use thiserror::Error;
use tracing::debug;

/// Upper bound for both listen limits, in seconds
pub const MAX_LISTEN_SECS: f64 = 3600.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How replies are turned into audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesizerConfig {
    /// Local espeak-ng process
    Espeak { program: String },

    /// OpenAI-compatible `/audio/speech` endpoint
    Http {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_tts_model")]
        model: String,
        #[serde(default = "default_tts_voice")]
        voice: String,
        /// Voice per language code, overriding `voice`
        #[serde(default)]
        voices: BTreeMap<String, String>,
    },
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        SynthesizerConfig::Espeak {
            program: "espeak-ng".to_string(),
        }
    }
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

/// External audio player command
///
/// The platform default player comes with its own arguments. A configured
/// program starts with no arguments unless `args` is given too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PlayerConfigFile")]
pub struct PlayerConfig {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Deserialize)]
struct PlayerConfigFile {
    #[serde(default)]
    program: Option<String>,
    #[serde(default)]
    args: Option<Vec<String>>,
}

impl From<PlayerConfigFile> for PlayerConfig {
    fn from(file: PlayerConfigFile) -> Self {
        match file.program {
            Some(program) => Self {
                program,
                args: file.args.unwrap_or_default(),
            },
            None => {
                let mut player = Self::default();
                if let Some(args) = file.args {
                    player.args = args;
                }
                player
            }
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                program: "afplay".to_string(),
                args: Vec::new(),
            }
        } else {
            Self {
                program: "aplay".to_string(),
                args: vec!["-q".to_string()],
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Speak replies aloud
    pub enabled: bool,
    pub synthesizer: SynthesizerConfig,
    pub player: PlayerConfig,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            synthesizer: SynthesizerConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

/// Limits for spoken input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenSettings {
    /// Maximum wait for speech to start (seconds)
    pub timeout_secs: f64,

    /// Maximum phrase length (seconds)
    pub phrase_time_limit_secs: f64,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 5.0,
            phrase_time_limit_secs: 10.0,
        }
    }
}

impl ListenSettings {
    /// Out-of-range values are clamped; `validate` rejects them first.
    pub fn timeout(&self) -> Duration {
        secs_to_duration(self.timeout_secs)
    }

    pub fn phrase_time_limit(&self) -> Duration {
        secs_to_duration(self.phrase_time_limit_secs)
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    // NaN.max(0.0) is 0.0
    Duration::from_secs_f64(secs.max(0.0).min(MAX_LISTEN_SECS))
}

/// OpenAI-compatible `/audio/transcriptions` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_stt_model")]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssistantConfig {
    /// Language at startup
    pub language: Language,
    pub matcher: MatcherConfig,
    pub voice: VoiceConfig,
    pub listen: ListenSettings,
    /// Spoken input is unavailable without a recognizer
    pub recognizer: Option<RecognizerConfig>,
}

impl AssistantConfig {
    /// File (if any), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config file {:?}", path);
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `DOCTOR_*` overrides read through `lookup`
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("DOCTOR_LANGUAGE") {
            self.language = value.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "DOCTOR_LANGUAGE",
                value,
            })?;
        }

        if let Some(value) = lookup("DOCTOR_CONFIDENCE_THRESHOLD") {
            self.matcher.confidence_threshold =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    key: "DOCTOR_CONFIDENCE_THRESHOLD",
                    value,
                })?;
        }

        if let Some(value) = lookup("DOCTOR_VOICE") {
            self.voice.enabled = parse_flag(&value).ok_or(ConfigError::InvalidEnv {
                key: "DOCTOR_VOICE",
                value,
            })?;
        }

        if let Some(key) = lookup("DOCTOR_TTS_API_KEY") {
            if let SynthesizerConfig::Http { api_key, .. } = &mut self.voice.synthesizer {
                *api_key = Some(key);
            }
        }

        if let Some(key) = lookup("DOCTOR_STT_API_KEY") {
            if let Some(recognizer) = &mut self.recognizer {
                recognizer.api_key = Some(key);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matcher
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for (name, secs) in [
            ("listen.timeout_secs", self.listen.timeout_secs),
            ("listen.phrase_time_limit_secs", self.listen.phrase_time_limit_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 || secs > MAX_LISTEN_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and {} seconds, got {}",
                    name, MAX_LISTEN_SECS, secs
                )));
            }
        }

        match &self.voice.synthesizer {
            SynthesizerConfig::Espeak { program } if program.trim().is_empty() => {
                return Err(ConfigError::Invalid(
                    "voice.synthesizer.program must not be empty".to_string(),
                ));
            }
            SynthesizerConfig::Http { endpoint, .. } if endpoint.trim().is_empty() => {
                return Err(ConfigError::Invalid(
                    "voice.synthesizer.endpoint must not be empty".to_string(),
                ));
            }
            SynthesizerConfig::Http { voices, .. } => {
                if let Some(code) = voices.keys().find(|code| code.parse::<Language>().is_err()) {
                    return Err(ConfigError::Invalid(format!(
                        "voice.synthesizer.voices: unknown language {:?}",
                        code
                    )));
                }
            }
            _ => {}
        }

        if self.voice.player.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "voice.player.program must not be empty".to_string(),
            ));
        }

        if let Some(recognizer) = &self.recognizer {
            if recognizer.endpoint.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "recognizer.endpoint must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
