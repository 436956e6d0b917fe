//! Chat session controller
//!
//! A [`Session`] owns the active language and routes text or spoken input to
//! the matcher. Replies, heard text and notices are delivered as
//! [`SessionEvent`]s so the foreground never waits on classification,
//! synthesis or transcription.

use crate::config::{AssistantConfig, SynthesizerConfig};
use crate::messages::{fallback_reply, Notice};
use parking_lot::RwLock;
use speech_io::{
    AudioSource, CommandPlayer, EspeakSynthesizer, HttpRecognizer, HttpSynthesizer, Speaker,
    Synthesizer, TranscribeRequest, Transcriber, TranscriptionError,
};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use symptom_matcher::{Classification, Language, MatchError, SymptomMatcher};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyKind {
    Diagnosis { category_id: String, score: f64 },
    Fallback { best_score: f64 },
}

/// The assistant's answer to one input
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub language: Language,
    pub kind: ReplyKind,
}

impl Reply {
    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, ReplyKind::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transcribed spoken input
    Heard(String),
    Reply(Reply),
    Notice { notice: Notice, language: Language },
}

/// Spoken input limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenLimits {
    pub timeout: Duration,
    pub phrase_time_limit: Duration,
}

impl Default for ListenLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            phrase_time_limit: Duration::from_secs(10),
        }
    }
}

/// Counts running workers so a caller can wait for them to finish
#[derive(Default)]
struct Workers {
    running: AtomicUsize,
    idle: Notify,
}

/// Marks one worker as running until dropped, even if the task is aborted
struct WorkerGuard(Arc<Workers>);

impl WorkerGuard {
    fn new(workers: &Arc<Workers>) -> Self {
        workers.running.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(workers))
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Clone)]
pub struct Session {
    matcher: Arc<SymptomMatcher>,
    language: Arc<RwLock<Language>>,
    speaker: Option<Speaker>,
    transcriber: Option<Transcriber>,
    limits: ListenLimits,
    events: mpsc::UnboundedSender<SessionEvent>,
    workers: Arc<Workers>,
}

impl Session {
    /// Text-only session; events arrive on the returned receiver
    pub fn new(
        matcher: Arc<SymptomMatcher>,
        language: Language,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            matcher,
            language: Arc::new(RwLock::new(language)),
            speaker: None,
            transcriber: None,
            limits: ListenLimits::default(),
            events,
            workers: Arc::new(Workers::default()),
        };
        (session, rx)
    }

    /// Build the matcher and speech collaborators described by `config`
    pub fn from_config(
        config: &AssistantConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), MatchError> {
        let matcher = Arc::new(SymptomMatcher::new(
            symptom_matcher::Corpus::builtin(),
            config.matcher,
        )?);
        let (mut session, rx) = Self::new(matcher, config.language);

        if config.voice.enabled {
            let synthesizer: Arc<dyn Synthesizer> = match &config.voice.synthesizer {
                SynthesizerConfig::Espeak { program } => {
                    Arc::new(EspeakSynthesizer::new(program.clone()))
                }
                SynthesizerConfig::Http {
                    endpoint,
                    api_key,
                    model,
                    voice,
                    voices,
                } => Arc::new(voices.iter().fold(
                    HttpSynthesizer::new(
                        endpoint.clone(),
                        api_key.clone(),
                        model.clone(),
                        voice.clone(),
                    ),
                    |synth, (language, voice)| synth.with_language_voice(language.clone(), voice.clone()),
                )),
            };
            let player = CommandPlayer::new(
                config.voice.player.program.clone(),
                config.voice.player.args.clone(),
            );
            session = session.with_speaker(Speaker::new(synthesizer, Arc::new(player)));
        }

        if let Some(recognizer) = &config.recognizer {
            let recognizer = HttpRecognizer::new(
                recognizer.endpoint.clone(),
                recognizer.api_key.clone(),
                recognizer.model.clone(),
            );
            session = session.with_transcriber(
                Transcriber::new(Arc::new(recognizer)),
                ListenLimits {
                    timeout: config.listen.timeout(),
                    phrase_time_limit: config.listen.phrase_time_limit(),
                },
            );
        }

        Ok((session, rx))
    }

    pub fn with_speaker(mut self, speaker: Speaker) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Transcriber, limits: ListenLimits) -> Self {
        self.transcriber = Some(transcriber);
        self.limits = limits;
        self
    }

    pub fn has_voice(&self) -> bool {
        self.speaker.is_some()
    }

    pub fn can_listen(&self) -> bool {
        self.transcriber.is_some()
    }

    pub fn language(&self) -> Language {
        *self.language.read()
    }

    pub fn set_language(&self, language: Language) {
        *self.language.write() = language;
        debug!("Language set to {}", language);
    }

    /// Switch to the other language and announce it
    pub fn toggle_language(&self) -> Language {
        let language = {
            let mut current = self.language.write();
            *current = current.toggled();
            *current
        };
        info!("Language switched to {}", language);

        self.emit(SessionEvent::Notice {
            notice: Notice::LanguageSwitched,
            language,
        });

        if let (Some(_), Some(spoken)) = (&self.speaker, Notice::LanguageSwitched.spoken(language)) {
            let session = self.clone();
            self.spawn_worker(async move { session.speak(spoken, language).await });
        }

        language
    }

    /// Reply to `text` in `language`; `None` for blank input
    pub fn respond_in(&self, text: &str, language: Language) -> Option<Reply> {
        let query = text.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        let classification = match self.matcher.classify(&query, language) {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Cannot classify input: {}", e);
                return None;
            }
        };

        let reply = match classification {
            Classification::Matched(m) => Reply {
                text: m.response,
                language,
                kind: ReplyKind::Diagnosis {
                    category_id: m.category_id,
                    score: m.score,
                },
            },
            Classification::Unmatched { best_score } => Reply {
                text: fallback_reply(language).to_string(),
                language,
                kind: ReplyKind::Fallback { best_score },
            },
        };

        debug!("Reply ({}): {:?}", language, reply.kind);
        Some(reply)
    }

    /// Reply in the current language
    pub fn respond(&self, text: &str) -> Option<Reply> {
        self.respond_in(text, self.language())
    }

    /// Dispatch typed input to a worker.
    ///
    /// The language is fixed when this is called; toggling afterwards does
    /// not affect the in-flight reply.
    pub fn submit(&self, text: &str) -> Option<JoinHandle<()>> {
        if text.trim().is_empty() {
            return None;
        }

        let language = self.language();
        let session = self.clone();
        let text = text.to_string();
        Some(self.spawn_worker(async move { session.process(text, language).await }))
    }

    /// Transcribe one phrase from `source`, then handle it like typed input
    pub fn listen(&self, mut source: AudioSource) -> JoinHandle<()> {
        let language = self.language();
        let session = self.clone();

        self.spawn_worker(async move {
            let Some(transcriber) = &session.transcriber else {
                session.notice(Notice::SpeechServiceUnavailable, language);
                return;
            };

            let request = TranscribeRequest {
                timeout: session.limits.timeout,
                phrase_time_limit: session.limits.phrase_time_limit,
                language: language.code().to_string(),
            };

            match transcriber.transcribe(&mut source, &request).await {
                Ok(text) => {
                    session.emit(SessionEvent::Heard(text.clone()));
                    session.process(text, language).await;
                }
                Err(TranscriptionError::NoSpeech) => {
                    session.notice(Notice::NoSpeech, language);
                }
                Err(TranscriptionError::Unintelligible) => {
                    session.notice(Notice::Unintelligible, language);
                }
                Err(TranscriptionError::Service(e)) => {
                    warn!("Speech recognition failed: {}", e);
                    session.notice(Notice::SpeechServiceFailed, language);
                }
            }
        })
    }

    /// Number of dispatched inputs and announcements still being handled
    pub fn pending(&self) -> usize {
        self.workers.running.load(Ordering::SeqCst)
    }

    /// Wait until every dispatched worker has finished.
    ///
    /// Their events are queued on the receiver by the time this returns.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.workers.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn spawn_worker<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = WorkerGuard::new(&self.workers);
        tokio::spawn(async move {
            let _guard = guard;
            work.await
        })
    }

    async fn process(&self, text: String, language: Language) {
        let session = self.clone();
        let reply =
            match tokio::task::spawn_blocking(move || session.respond_in(&text, language)).await {
                Ok(Some(reply)) => reply,
                Ok(None) => return,
                Err(e) => {
                    error!("Classification worker failed: {}", e);
                    return;
                }
            };

        let spoken = reply.text.clone();
        self.emit(SessionEvent::Reply(reply));
        self.speak(&spoken, language).await;
    }

    async fn speak(&self, text: &str, language: Language) {
        let Some(speaker) = &self.speaker else {
            return;
        };

        if let Err(e) = speaker.speak(text, language.code()).await {
            warn!("Voice output failed: {}", e);
            self.notice(Notice::VoiceOutputFailed, language);
        }
    }

    fn notice(&self, notice: Notice, language: Language) {
        self.emit(SessionEvent::Notice { notice, language });
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("Session event dropped: receiver closed");
        }
    }
}
