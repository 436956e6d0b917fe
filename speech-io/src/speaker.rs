//! Speaker: synthesize then play

use crate::playback::{AudioPlayer, PlaybackError};
use crate::synthesis::{SynthesisError, Synthesizer};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SpeakError {
    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

#[derive(Clone)]
pub struct Speaker {
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn AudioPlayer>,
}

impl Speaker {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            synthesizer,
            player,
        }
    }

    /// Speak `text` and wait until playback completes.
    ///
    /// The synthesized artifact is released whether or not playback succeeds.
    pub async fn speak(&self, text: &str, language: &str) -> Result<(), SpeakError> {
        let artifact = self.synthesizer.synthesize(text, language).await?;
        let played = self.player.play(artifact.path()).await;
        drop(artifact);

        played?;
        debug!("Spoke {} chars in {}", text.chars().count(), language);
        Ok(())
    }
}
