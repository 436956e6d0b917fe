//! Bounded listening module
//!
//! Waits for speech onset on an audio source, then captures one phrase until
//! the VAD reports silence again or the phrase limit is hit.

use crate::audio::{downmix_to_mono, AudioError, AudioFormat, AudioSample, AudioSource, DEFAULT_FRAME_MS};
use crate::vad::{VadConfig, VadError, VoiceActivityDetector};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, trace};

#[derive(Error, Debug)]
pub enum ListenError {
    #[error("No speech detected within {waited:?}")]
    NoSpeech { waited: Duration },

    #[error("Audio source closed before speech was detected")]
    SourceClosed,

    #[error("Invalid audio format: {0}")]
    InvalidFormat(#[from] AudioError),

    #[error("Invalid listen configuration: {0}")]
    InvalidConfig(String),

    #[error("VAD error: {0}")]
    Vad(#[from] VadError),
}

/// Longest accepted onset wait or phrase limit
pub const MAX_LISTEN_DURATION: Duration = Duration::from_secs(3600);

/// Listening limits and detector tuning
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Maximum wait for speech to begin
    pub timeout: Duration,

    /// Maximum length of a captured phrase
    pub phrase_time_limit: Duration,

    /// Analysis frame length; the VAD frame size is derived from it
    pub frame_ms: u64,

    /// Audio kept from before the onset was confirmed
    pub pre_roll: Duration,

    /// Detector thresholds
    pub vad: VadConfig,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            phrase_time_limit: Duration::from_secs(10),
            frame_ms: DEFAULT_FRAME_MS,
            pre_roll: Duration::from_millis(300),
            vad: VadConfig::default(),
        }
    }
}

impl ListenConfig {
    pub fn validate(&self) -> Result<(), ListenError> {
        for (name, limit) in [
            ("timeout", self.timeout),
            ("phrase_time_limit", self.phrase_time_limit),
        ] {
            if limit.is_zero() || limit > MAX_LISTEN_DURATION {
                return Err(ListenError::InvalidConfig(format!(
                    "{} must be between 0 and {:?}, got {:?}",
                    name, MAX_LISTEN_DURATION, limit
                )));
            }
        }

        if self.frame_ms == 0 {
            return Err(ListenError::InvalidConfig(
                "frame_ms must be greater than 0".to_string(),
            ));
        }

        self.vad.validate()?;
        Ok(())
    }
}

/// One captured phrase
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<AudioSample>,
    pub sample_rate: u32,
    /// Cut off by the phrase limit rather than ended by silence
    pub truncated: bool,
}

impl Utterance {
    pub fn duration(&self) -> Duration {
        AudioFormat::mono(self.sample_rate).duration_of(self.samples.len())
    }
}

pub struct Listener {
    config: ListenConfig,
}

impl Listener {
    pub fn new(config: ListenConfig) -> Result<Self, ListenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ListenConfig {
        &self.config
    }

    /// Capture one phrase from `source`.
    ///
    /// The onset wait is bounded both in audio time (samples analysed) and in
    /// wall-clock time, so a stalled source cannot block forever.
    pub async fn listen(&self, source: &mut AudioSource) -> Result<Utterance, ListenError> {
        let format = source.format;
        format.validate()?;

        let vad_config = self
            .config
            .vad
            .clone()
            .with_frame_duration(format.sample_rate, self.config.frame_ms);
        let frame_size = vad_config.frame_size;
        let pre_roll_frames = (self.config.pre_roll.as_millis() as usize
            / self.config.frame_ms as usize)
            + vad_config.speech_frames_required;
        let mut vad = VoiceActivityDetector::new(vad_config);

        let onset_limit = format.samples_for(self.config.timeout);
        let phrase_limit = format.samples_for(self.config.phrase_time_limit).max(1);

        let onset_deadline = Instant::now() + self.config.timeout;
        let mut phrase_deadline: Option<Instant> = None;

        let mut pending: Vec<AudioSample> = Vec::new();
        let mut pre_roll: VecDeque<Vec<AudioSample>> = VecDeque::new();
        let mut captured: Vec<AudioSample> = Vec::new();
        let mut analysed = 0usize;

        debug!(
            "Listening: timeout={:?}, phrase_time_limit={:?}, frame_size={}",
            self.config.timeout, self.config.phrase_time_limit, frame_size
        );

        loop {
            let deadline = phrase_deadline.unwrap_or(onset_deadline);
            let chunk = match tokio::time::timeout_at(deadline, source.frames.recv()).await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    if phrase_deadline.is_none() {
                        debug!("Source closed after {} samples without speech", analysed);
                        return Err(ListenError::SourceClosed);
                    }
                    captured.extend_from_slice(&pending);
                    return Ok(self.finish(captured, phrase_limit, format.sample_rate, false));
                }
                Err(_) => {
                    if phrase_deadline.is_none() {
                        debug!("Wall-clock timeout waiting for speech");
                        return Err(ListenError::NoSpeech {
                            waited: self.config.timeout,
                        });
                    }
                    captured.extend_from_slice(&pending);
                    return Ok(self.finish(captured, phrase_limit, format.sample_rate, true));
                }
            };

            pending.extend(downmix_to_mono(&chunk, format.channels));

            while pending.len() >= frame_size {
                let frame: Vec<AudioSample> = pending.drain(..frame_size).collect();
                let active = vad.process_frame(&frame)?;

                if phrase_deadline.is_none() {
                    analysed += frame.len();
                    pre_roll.push_back(frame);
                    if pre_roll.len() > pre_roll_frames {
                        pre_roll.pop_front();
                    }

                    if active {
                        info!(
                            "Speech onset after {:?}",
                            format.duration_of(analysed)
                        );
                        captured.extend(pre_roll.drain(..).flatten());
                        phrase_deadline = Some(Instant::now() + self.config.phrase_time_limit);
                    } else if analysed >= onset_limit {
                        return Err(ListenError::NoSpeech {
                            waited: format.duration_of(analysed),
                        });
                    }
                } else {
                    captured.extend_from_slice(&frame);
                    if !active {
                        trace!("VAD returned to silence");
                        return Ok(self.finish(captured, phrase_limit, format.sample_rate, false));
                    }
                }

                if captured.len() >= phrase_limit {
                    return Ok(self.finish(captured, phrase_limit, format.sample_rate, true));
                }
            }
        }
    }

    fn finish(
        &self,
        mut samples: Vec<AudioSample>,
        phrase_limit: usize,
        sample_rate: u32,
        mut truncated: bool,
    ) -> Utterance {
        if samples.len() > phrase_limit {
            samples.truncate(phrase_limit);
            truncated = true;
        }

        let utterance = Utterance {
            samples,
            sample_rate,
            truncated,
        };
        info!(
            "Captured utterance: {:?} (truncated={})",
            utterance.duration(),
            utterance.truncated
        );
        utterance
    }
}
