//! Speech I/O library
//!
//! Audio helpers, voice activity detection, bounded listening and the
//! transcription, synthesis and playback collaborators used by the assistant.

pub mod audio;
pub mod listener;
pub mod playback;
pub mod speaker;
pub mod synthesis;
pub mod transcriber;
pub mod vad;

// Re-export main types
pub use audio::{
    downmix_to_mono, encode_wav, read_wav, write_wav, AudioError, AudioFormat, AudioSample,
    AudioSource, WavSource, DEFAULT_FRAME_MS,
};
pub use listener::{ListenConfig, ListenError, Listener, Utterance, MAX_LISTEN_DURATION};
pub use playback::{AudioPlayer, CommandPlayer, PlaybackError};
pub use speaker::{SpeakError, Speaker};
pub use synthesis::{AudioArtifact, EspeakSynthesizer, HttpSynthesizer, SynthesisError, Synthesizer};
pub use transcriber::{
    HttpRecognizer, SpeechRecognizer, TranscribeRequest, Transcriber, TranscriptionError,
};
pub use vad::{VadConfig, VadError, VadState, VoiceActivityDetector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
