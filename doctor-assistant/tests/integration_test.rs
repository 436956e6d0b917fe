//! Integration tests for the doctor assistant
//!
//! Drives a session end to end with in-process speech collaborators.

use async_trait::async_trait;
use doctor_assistant::{
    fallback_reply, AssistantConfig, ListenLimits, Notice, ReplyKind, Session, SessionEvent,
};
use serial_test::serial;
use speech_io::{
    AudioArtifact, AudioPlayer, AudioSource, PlaybackError, SpeechRecognizer, Speaker,
    SynthesisError, Synthesizer, Transcriber, TranscriptionError, Utterance, WavSource,
    DEFAULT_FRAME_MS,
};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use symptom_matcher::{Language, SymptomMatcher};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

const RATE: u32 = 16000;

/// Records every synthesis request
struct RecordingSynthesizer {
    dir: TempDir,
    calls: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact, SynthesisError> {
        let _ = self.calls.send((text.to_string(), language.to_string()));
        Ok(AudioArtifact::create(Some(self.dir.path()), ".wav")?)
    }
}

struct StubPlayer {
    fail: bool,
}

#[async_trait]
impl AudioPlayer for StubPlayer {
    async fn play(&self, _path: &Path) -> Result<(), PlaybackError> {
        if self.fail {
            return Err(PlaybackError::Spawn {
                program: "stub".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no audio device"),
            });
        }
        Ok(())
    }
}

/// Answers every utterance with a fixed result
struct ScriptedRecognizer {
    result: Result<String, &'static str>,
    languages: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        _utterance: &Utterance,
        language: &str,
    ) -> Result<String, TranscriptionError> {
        let _ = self.languages.send(language.to_string());
        match self.result {
            Ok(ref text) => Ok(text.clone()),
            Err("unintelligible") => Err(TranscriptionError::Unintelligible),
            Err(message) => Err(TranscriptionError::Service(message.to_string())),
        }
    }
}

fn text_session() -> (Session, mpsc::UnboundedReceiver<SessionEvent>) {
    let matcher = Arc::new(SymptomMatcher::builtin().unwrap());
    Session::new(matcher, Language::English)
}

fn voiced_session(
    fail_playback: bool,
) -> (
    Session,
    mpsc::UnboundedReceiver<SessionEvent>,
    mpsc::UnboundedReceiver<(String, String)>,
) {
    let (calls_tx, calls_rx) = mpsc::unbounded_channel();
    let synthesizer = RecordingSynthesizer {
        dir: tempfile::tempdir().unwrap(),
        calls: calls_tx,
    };
    let speaker = Speaker::new(
        Arc::new(synthesizer),
        Arc::new(StubPlayer {
            fail: fail_playback,
        }),
    );

    let (session, events) = text_session();
    (session.with_speaker(speaker), events, calls_rx)
}

fn listening_session(
    result: Result<String, &'static str>,
) -> (
    Session,
    mpsc::UnboundedReceiver<SessionEvent>,
    mpsc::UnboundedReceiver<String>,
) {
    let (languages_tx, languages_rx) = mpsc::unbounded_channel();
    let recognizer = ScriptedRecognizer {
        result,
        languages: languages_tx,
    };

    let (session, events) = text_session();
    let session = session.with_transcriber(
        Transcriber::new(Arc::new(recognizer)),
        ListenLimits::default(),
    );
    (session, events, languages_rx)
}

fn spoken_phrase() -> AudioSource {
    let mut samples = vec![0.0; RATE as usize / 2];
    samples.extend((0..RATE as usize).map(|i| {
        let t = i as f32 / RATE as f32;
        0.3 * (2.0 * PI * 250.0 * t).sin()
    }));
    samples.extend(vec![0.0; RATE as usize]);

    WavSource::from_samples(RATE, samples)
        .unwrap()
        .stream(DEFAULT_FRAME_MS, false)
}

fn silent_recording() -> AudioSource {
    WavSource::from_samples(RATE, vec![0.0; 6 * RATE as usize])
        .unwrap()
        .stream(DEFAULT_FRAME_MS, false)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("session event channel closed")
}

#[tokio::test]
async fn test_typed_english_conversation() {
    let (session, mut events) = text_session();

    for (input, expected) in [
        ("I have a fever and chills", "Diagnosis: Viral Fever."),
        ("my stomach hurts and I have diarrhea", "Diagnosis: Gastric Issue."),
        ("thank you doctor, goodbye", "You're welcome!"),
    ] {
        session.submit(input).unwrap().await.unwrap();
        match next_event(&mut events).await {
            SessionEvent::Reply(reply) => assert!(reply.text.starts_with(expected)),
            other => panic!("Expected reply, got {:?}", other),
        }
    }

    session.submit("xyz completely unrelated gibberish").unwrap().await.unwrap();
    match next_event(&mut events).await {
        SessionEvent::Reply(reply) => {
            assert_eq!(reply.text, fallback_reply(Language::English));
            assert!(matches!(reply.kind, ReplyKind::Fallback { .. }));
        }
        other => panic!("Expected fallback, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hindi_conversation_after_toggle() {
    let (session, mut events) = text_session();

    session.toggle_language();
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Notice {
            notice: Notice::LanguageSwitched,
            language: Language::Hindi
        }
    ));

    session.submit("मुझे सिर दर्द हो रहा है").unwrap().await.unwrap();
    match next_event(&mut events).await {
        SessionEvent::Reply(reply) => {
            assert_eq!(reply.language, Language::Hindi);
            assert!(reply.text.starts_with("निदान: सिरदर्द।"));
        }
        other => panic!("Expected reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_language_is_snapshotted_at_dispatch() {
    let (session, mut events) = text_session();

    let pending = session.submit("I have a fever and chills").unwrap();
    session.toggle_language();
    pending.await.unwrap();

    let mut reply_language = None;
    for _ in 0..2 {
        if let SessionEvent::Reply(reply) = next_event(&mut events).await {
            reply_language = Some(reply.language);
            assert!(reply.text.starts_with("Diagnosis: Viral Fever."));
        }
    }
    assert_eq!(reply_language, Some(Language::English));
    assert_eq!(session.language(), Language::Hindi);
}

#[tokio::test]
async fn test_reply_is_spoken_in_its_language() {
    let (session, mut events, mut calls) = voiced_session(false);

    session.set_language(Language::Hindi);
    session.submit("मुझे बुखार है").unwrap().await.unwrap();

    assert!(matches!(next_event(&mut events).await, SessionEvent::Reply(_)));
    let (text, language) = calls.recv().await.unwrap();
    assert!(text.starts_with("निदान: वायरल बुखार।"));
    assert_eq!(language, "hi");
}

#[tokio::test]
async fn test_language_switch_is_announced_aloud() {
    let (session, _events, mut calls) = voiced_session(false);

    session.toggle_language();

    let (text, language) = timeout(Duration::from_secs(5), calls.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(text, "भाषा हिंदी में बदल दी गई है");
    assert_eq!(language, "hi");
}

#[tokio::test]
async fn test_voice_failure_keeps_chat_going() {
    let (session, mut events, _calls) = voiced_session(true);

    session.submit("splitting headache").unwrap().await.unwrap();

    assert!(matches!(next_event(&mut events).await, SessionEvent::Reply(_)));
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Notice {
            notice: Notice::VoiceOutputFailed,
            language: Language::English
        }
    );

    session.submit("hello").unwrap().await.unwrap();
    assert!(matches!(next_event(&mut events).await, SessionEvent::Reply(_)));
}

#[tokio::test]
async fn test_spoken_input_is_answered() {
    let (session, mut events, mut languages) =
        listening_session(Ok("मुझे बुखार है".to_string()));
    session.set_language(Language::Hindi);

    session.listen(spoken_phrase()).await.unwrap();

    assert_eq!(languages.recv().await.unwrap(), "hi");
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Heard("मुझे बुखार है".to_string())
    );
    match next_event(&mut events).await {
        SessionEvent::Reply(reply) => {
            assert!(matches!(
                &reply.kind,
                ReplyKind::Diagnosis { category_id, .. } if category_id == "fever"
            ));
            assert!(reply.text.starts_with("निदान: वायरल बुखार।"));
        }
        other => panic!("Expected reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_silence_reports_no_speech() {
    let (session, mut events, mut languages) = listening_session(Ok("unused".to_string()));

    session.listen(silent_recording()).await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Notice {
            notice: Notice::NoSpeech,
            language: Language::English
        }
    );
    assert!(languages.try_recv().is_err());
}

#[tokio::test]
async fn test_recognizer_failures_become_notices() {
    let (session, mut events, _) = listening_session(Err("unintelligible"));
    session.listen(spoken_phrase()).await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Notice {
            notice: Notice::Unintelligible,
            language: Language::English
        }
    );

    let (session, mut events, _) = listening_session(Err("503 service unavailable"));
    session.listen(spoken_phrase()).await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Notice {
            notice: Notice::SpeechServiceFailed,
            language: Language::English
        }
    );
}

#[test]
#[serial]
fn test_config_load_reads_environment() {
    std::env::set_var("DOCTOR_LANGUAGE", "hi");
    std::env::set_var("DOCTOR_VOICE", "false");
    let config = AssistantConfig::load(None);
    std::env::remove_var("DOCTOR_LANGUAGE");
    std::env::remove_var("DOCTOR_VOICE");

    let config = config.unwrap();
    assert_eq!(config.language, Language::Hindi);
    assert!(!config.voice.enabled);
}

#[test]
#[serial]
fn test_invalid_threshold_fails_at_startup() {
    std::env::set_var("DOCTOR_CONFIDENCE_THRESHOLD", "2.5");
    let result = AssistantConfig::load(None);
    std::env::remove_var("DOCTOR_CONFIDENCE_THRESHOLD");

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_session_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doctor.yaml");
    std::fs::write(
        &path,
        "language: hi\nvoice:\n  enabled: false\nrecognizer:\n  endpoint: http://localhost:9000/v1\n",
    )
    .unwrap();

    let config = AssistantConfig::load(Some(&path)).unwrap();
    let (session, _events) = Session::from_config(&config).unwrap();

    assert_eq!(session.language(), Language::Hindi);
    assert!(!session.has_voice());
    assert!(session.can_listen());
}

/// Runs the chat binary text-only with `input` piped on stdin
fn run_chat(input: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(env!("CARGO_BIN_EXE_doctor-assistant"))
        .arg("--no-voice")
        .env_remove("DOCTOR_LANGUAGE")
        .env_remove("DOCTOR_VOICE")
        .env_remove("DOCTOR_CONFIDENCE_THRESHOLD")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Dropping stdin closes it
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
#[serial]
fn test_chat_answers_before_exit_at_end_of_input() {
    for _ in 0..5 {
        let stdout = run_chat("I have a fever and chills\n");
        assert!(
            stdout.contains("Doctor: Diagnosis: Viral Fever."),
            "reply missing from output:\n{}",
            stdout
        );
    }
}

#[test]
#[serial]
fn test_chat_answers_before_quit() {
    let stdout = run_chat("my stomach hurts and I have diarrhea\n/lang\nमुझे सिर दर्द हो रहा है\n/quit\n");

    assert!(stdout.contains("Doctor: Diagnosis: Gastric Issue."));
    assert!(stdout.contains("निदान: सिरदर्द।"));
}

#[test]
#[serial]
fn test_oversized_listen_timeout_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doctor.yaml");
    std::fs::write(
        &path,
        "voice:\n  enabled: false\nlisten:\n  timeout_secs: 1.0e20\nrecognizer:\n  endpoint: http://localhost:9000/v1\n",
    )
    .unwrap();

    assert!(AssistantConfig::load(Some(&path)).is_err());

    // Building a session from the unchecked file must not panic either
    let config = AssistantConfig::from_file(&path).unwrap();
    let (session, _events) = Session::from_config(&config).unwrap();
    assert!(session.can_listen());
}
