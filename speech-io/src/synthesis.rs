//! Text-to-speech
//!
//! Synthesizers render text into an [`AudioArtifact`]: a uniquely named
//! temporary audio file that is deleted when dropped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempPath;
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Nothing to synthesize")]
    EmptyText,

    #[error("Synthesizer process failed: {0}")]
    Process(String),

    #[error("Speech service error: {0}")]
    Service(String),

    #[error("Audio artifact error: {0}")]
    Io(#[from] io::Error),
}

/// Temporary synthesized audio, removed on drop
#[derive(Debug)]
pub struct AudioArtifact {
    path: TempPath,
}

impl AudioArtifact {
    /// Reserve a new uniquely named file, in `dir` or the system temp dir.
    pub fn create(dir: Option<&Path>, extension: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("speech-").suffix(extension);

        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` spoken in `language` (`en`, `hi`, ...).
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact, SynthesisError>;
}

/// Offline synthesis through the espeak-ng command line
pub struct EspeakSynthesizer {
    program: String,
    artifact_dir: Option<PathBuf>,
}

impl EspeakSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            artifact_dir: None,
        }
    }

    /// Stage artifacts in `dir` instead of the system temp dir
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

#[async_trait]
impl Synthesizer for EspeakSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let artifact = AudioArtifact::create(self.artifact_dir.as_deref(), ".wav")?;
        debug!(
            "Synthesizing {} chars ({}) into {:?}",
            text.chars().count(),
            language,
            artifact.path()
        );

        let output = TokioCommand::new(&self.program)
            .arg("-v")
            .arg(language)
            .arg("-w")
            .arg(artifact.path())
            .arg(text)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SynthesisError::Process(format!("failed to start '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            return Err(SynthesisError::Process(format!(
                "'{}' exited with {}",
                self.program, output.status
            )));
        }

        Ok(artifact)
    }
}

/// Synthesis through an OpenAI-compatible `/audio/speech` endpoint
///
/// The request has no language field; the service reads the language from
/// the text itself. Per-language voices can be set with
/// [`HttpSynthesizer::with_language_voice`], otherwise every language uses
/// the default voice.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    language_voices: HashMap<String, String>,
    artifact_dir: Option<PathBuf>,
}

impl HttpSynthesizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            model: model.into(),
            voice: voice.into(),
            language_voices: HashMap::new(),
            artifact_dir: None,
        }
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Use `voice` for text in `language` (`en`, `hi`, ...)
    pub fn with_language_voice(
        mut self,
        language: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        self.language_voices.insert(language.into(), voice.into());
        self
    }

    pub fn voice_for(&self, language: &str) -> &str {
        self.language_voices
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.voice)
    }

    fn url(&self) -> String {
        format!("{}/audio/speech", self.endpoint)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact, SynthesisError> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let voice = self.voice_for(language);
        let mut request = self.client.post(self.url()).json(&SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: "wav",
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(
            "Requesting speech for {} chars ({}, voice={})",
            text.chars().count(),
            language,
            voice
        );
        let response = request
            .send()
            .await
            .map_err(|e| SynthesisError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Speech API error {}: {}", status, body);
            return Err(SynthesisError::Service(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Service(e.to_string()))?;

        let artifact = AudioArtifact::create(self.artifact_dir.as_deref(), ".wav")?;
        tokio::fs::write(artifact.path(), &audio).await?;
        info!("Synthesized {} bytes of audio", audio.len());

        Ok(artifact)
    }
}
