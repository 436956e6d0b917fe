//! Speech-to-text
//!
//! A [`Transcriber`] listens for one phrase and hands it to a
//! [`SpeechRecognizer`]. The HTTP recognizer speaks the OpenAI-compatible
//! `/audio/transcriptions` API.

use crate::audio::{encode_wav, AudioSource};
use crate::listener::{ListenConfig, ListenError, Listener, Utterance};
use crate::vad::VadConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("No speech detected")]
    NoSpeech,

    #[error("Could not understand audio")]
    Unintelligible,

    #[error("Speech service error: {0}")]
    Service(String),
}

impl From<ListenError> for TranscriptionError {
    fn from(err: ListenError) -> Self {
        match err {
            ListenError::NoSpeech { .. } | ListenError::SourceClosed => Self::NoSpeech,
            other => Self::Service(other.to_string()),
        }
    }
}

/// Turns a captured phrase into text
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// `language` is a BCP-47 style code such as `en` or `hi`.
    async fn recognize(&self, utterance: &Utterance, language: &str)
        -> Result<String, TranscriptionError>;
}

#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Recognizer backed by an OpenAI-compatible transcription endpoint
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpRecognizer {
    /// `endpoint` is the API base, e.g. `https://api.openai.com/v1`.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            model: model.into(),
        }
    }

    fn url(&self) -> String {
        format!("{}/audio/transcriptions", self.endpoint)
    }
}

#[async_trait]
impl SpeechRecognizer for HttpRecognizer {
    async fn recognize(
        &self,
        utterance: &Utterance,
        language: &str,
    ) -> Result<String, TranscriptionError> {
        let audio = encode_wav(utterance.sample_rate, &utterance.samples)
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;
        debug!("Uploading {} bytes of audio for transcription", audio.len());

        let file = reqwest::multipart::Part::bytes(audio)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let mut request = self.client.post(self.url()).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!("Transcription request failed: {}", e);
            TranscriptionError::Service(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Transcription API error {}: {}", status, body);
            return Err(TranscriptionError::Service(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;

        let text = result.text.trim();
        if text.is_empty() {
            return Err(TranscriptionError::Unintelligible);
        }

        info!("Transcription complete: {:?}", text);
        Ok(text.to_string())
    }
}

/// Limits for one transcription call
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    pub timeout: Duration,
    pub phrase_time_limit: Duration,
    pub language: String,
}

impl TranscribeRequest {
    pub fn new(language: impl Into<String>) -> Self {
        let defaults = ListenConfig::default();
        Self {
            timeout: defaults.timeout,
            phrase_time_limit: defaults.phrase_time_limit,
            language: language.into(),
        }
    }
}

/// Listener plus recognizer
#[derive(Clone)]
pub struct Transcriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    vad: VadConfig,
}

impl Transcriber {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self::with_vad(recognizer, VadConfig::default())
    }

    pub fn with_vad(recognizer: Arc<dyn SpeechRecognizer>, vad: VadConfig) -> Self {
        Self { recognizer, vad }
    }

    /// Listen on `source` within the request limits and return the text.
    pub async fn transcribe(
        &self,
        source: &mut AudioSource,
        request: &TranscribeRequest,
    ) -> Result<String, TranscriptionError> {
        let listener = Listener::new(ListenConfig {
            timeout: request.timeout,
            phrase_time_limit: request.phrase_time_limit,
            vad: self.vad.clone(),
            ..Default::default()
        })?;

        let utterance = listener.listen(source).await?;
        self.recognizer.recognize(&utterance, &request.language).await
    }
}
