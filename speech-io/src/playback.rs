//! Audio playback module
//!
//! Plays an audio file through an external player process. The returned
//! future completes when the player exits.

use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to start player '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Player '{program}' exited with {status}")]
    PlayerFailed { program: String, status: ExitStatus },
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Resolves once playback of `path` has finished.
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Runs `program [args..] <file>` and waits for it to exit
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandPlayer {
    /// `afplay` on macOS, `aplay -q` elsewhere
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("afplay", Vec::new())
        } else {
            Self::new("aplay", vec!["-q".to_string()])
        }
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        debug!("Playing {:?} with {}", path, self.program);

        let status = TokioCommand::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| PlaybackError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(PlaybackError::PlayerFailed {
                program: self.program.clone(),
                status,
            });
        }

        debug!("Playback finished");
        Ok(())
    }
}
