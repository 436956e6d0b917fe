//! Doctor assistant library
//!
//! Bilingual (English/Hindi) symptom-checker chat: configuration, localized
//! notices and the session controller that ties the matcher to optional
//! speech input and output.

pub mod commands;
pub mod config;
pub mod messages;
pub mod session;

// Re-export main types
pub use commands::Command;
pub use config::{
    AssistantConfig, ConfigError, ListenSettings, PlayerConfig, RecognizerConfig,
    SynthesizerConfig, VoiceConfig,
};
pub use messages::{fallback_reply, Notice};
pub use session::{ListenLimits, Reply, ReplyKind, Session, SessionEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
