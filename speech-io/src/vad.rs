//! Voice activity detection
//!
//! Classifies fixed-size frames as voiced or not from their RMS energy and
//! zero-crossing rate, and smooths the per-frame decision with a small state
//! machine so one loud click does not start a phrase and one short pause
//! does not end it.

use crate::audio::AudioSample;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VadError {
    #[error("Insufficient audio data: need at least {0} samples")]
    InsufficientData(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VadConfig {
    /// Minimum RMS level of a voiced frame, as a fraction of full scale
    pub energy_threshold: f32,

    /// Frames crossing zero more often than this are treated as noise
    pub max_zero_crossing_rate: f32,

    /// Samples per analysis frame
    pub frame_size: usize,

    /// Consecutive voiced frames before speech is confirmed
    pub speech_frames_required: usize,

    /// Consecutive unvoiced frames before speech is over
    pub silence_frames_required: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.02,
            // Broadband noise sits near 0.5
            max_zero_crossing_rate: 0.35,
            // 30ms at 16kHz
            frame_size: 480,
            speech_frames_required: 3,
            // 750ms pause ends a phrase
            silence_frames_required: 25,
        }
    }
}

impl VadConfig {
    pub fn validate(&self) -> Result<(), VadError> {
        for (name, value) in [
            ("energy_threshold", self.energy_threshold),
            ("max_zero_crossing_rate", self.max_zero_crossing_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VadError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if self.frame_size == 0 || self.speech_frames_required == 0 || self.silence_frames_required == 0 {
            return Err(VadError::InvalidConfig(
                "frame size and frame counts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Same config with the frame size set to `frame_ms` at a sample rate
    pub fn with_frame_duration(mut self, sample_rate: u32, frame_ms: u64) -> Self {
        self.frame_size = ((sample_rate as u64 * frame_ms) / 1000).max(1) as usize;
        self
    }
}

/// Smoothed detector state
///
/// The two `Maybe` states hold a pending change until enough consecutive
/// frames agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence,
    MaybeSpeech,
    Speech,
    MaybeSilence,
}

pub struct VoiceActivityDetector {
    config: VadConfig,
    state: VadState,
    /// Consecutive frames agreeing with the pending change
    streak: usize,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        debug!("VAD config: {:?}", config);
        Self {
            config,
            state: VadState::Silence,
            streak: 0,
        }
    }

    /// Feed one frame; returns whether the detector is inside speech
    pub fn process_frame(&mut self, frame: &[AudioSample]) -> Result<bool, VadError> {
        if frame.len() < self.config.frame_size {
            return Err(VadError::InsufficientData(self.config.frame_size));
        }

        let voiced = self.is_voiced(frame);
        self.advance(voiced);
        Ok(self.is_speech_active())
    }

    /// Per-frame decision, without smoothing
    pub fn is_voiced(&self, frame: &[AudioSample]) -> bool {
        let energy = rms_energy(frame);
        let zcr = zero_crossing_rate(frame);
        trace!("energy={:.4} zcr={:.4} state={:?}", energy, zcr, self.state);

        energy > self.config.energy_threshold && zcr <= self.config.max_zero_crossing_rate
    }

    fn advance(&mut self, voiced: bool) {
        use VadState::*;

        let previous = self.state;
        self.state = match (previous, voiced) {
            (Silence, false) | (Speech, true) => {
                self.streak = 0;
                previous
            }
            (MaybeSpeech, false) => {
                self.streak = 0;
                Silence
            }
            (MaybeSilence, true) => {
                self.streak = 0;
                Speech
            }
            (Silence, true) | (MaybeSpeech, true) => {
                self.confirm(self.config.speech_frames_required, MaybeSpeech, Speech)
            }
            (Speech, false) | (MaybeSilence, false) => {
                self.confirm(self.config.silence_frames_required, MaybeSilence, Silence)
            }
        };

        if self.state != previous {
            debug!("VAD {:?} -> {:?}", previous, self.state);
        }
    }

    fn confirm(&mut self, required: usize, pending: VadState, settled: VadState) -> VadState {
        self.streak += 1;
        if self.streak >= required {
            self.streak = 0;
            settled
        } else {
            pending
        }
    }

    /// True from confirmed onset until the silence run completes
    pub fn is_speech_active(&self) -> bool {
        matches!(self.state, VadState::Speech | VadState::MaybeSilence)
    }

    pub fn state(&self) -> VadState {
        self.state
    }
}

/// RMS level of a frame
pub fn rms_energy(samples: &[AudioSample]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Fraction of adjacent sample pairs that change sign
///
/// Voiced speech crosses zero slowly; broadband noise crosses it on roughly
/// every other sample.
pub fn zero_crossing_rate(samples: &[AudioSample]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
        .count();

    crossings as f32 / (samples.len() - 1) as f32
}
