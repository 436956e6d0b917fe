//! Audio helpers module
//!
//! Mono f32 sample handling, WAV encode/decode and a file-backed audio source
//! that streams frames over a channel the way a capture device would.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Audio sample format (f32 normalized to -1.0 to 1.0)
pub type AudioSample = f32;

/// Default frame duration for streaming and VAD analysis
pub const DEFAULT_FRAME_MS: u64 = 30;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Invalid sample rate: {0} Hz (must be > 0)")]
    InvalidSampleRate(u32),

    #[error("Invalid channel count: {0} (must be > 0)")]
    InvalidChannelCount(u16),

    #[error("Empty audio buffer")]
    EmptyBuffer,

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Sample rate and channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Single-channel format at a sample rate
    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    /// Validate format parameters
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(self.sample_rate));
        }

        if self.channels == 0 {
            return Err(AudioError::InvalidChannelCount(self.channels));
        }

        Ok(())
    }

    /// Number of samples (per channel) covering a duration
    pub fn samples_for(&self, duration: Duration) -> usize {
        (self.sample_rate as u128 * duration.as_millis() / 1000) as usize
    }

    /// Duration covered by a number of mono samples
    pub fn duration_of(&self, samples: usize) -> Duration {
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }
}

/// Average interleaved channels down to mono
pub fn downmix_to_mono(interleaved: &[AudioSample], channels: u16) -> Vec<AudioSample> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    let channels = channels as usize;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Read a WAV file as mono f32 samples
pub fn read_wav(path: impl AsRef<Path>) -> Result<(AudioFormat, Vec<AudioSample>), AudioError> {
    let mut reader = hound::WavReader::open(path.as_ref())?;
    let spec = reader.spec();

    let format = AudioFormat::new(spec.sample_rate, spec.channels);
    format.validate()?;

    let interleaved: Vec<AudioSample> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    debug!(
        "Read {:?}: {}Hz, {} channels, {} bits, {} samples",
        path.as_ref(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        interleaved.len()
    );

    Ok((
        AudioFormat::mono(spec.sample_rate),
        downmix_to_mono(&interleaved, spec.channels),
    ))
}

fn pcm16_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_pcm16(sample: AudioSample) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Write mono samples as a 16-bit PCM WAV file
pub fn write_wav(
    path: impl AsRef<Path>,
    sample_rate: u32,
    samples: &[AudioSample],
) -> Result<(), AudioError> {
    let mut writer = hound::WavWriter::create(path, pcm16_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(to_pcm16(sample))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Encode mono samples as an in-memory 16-bit PCM WAV
pub fn encode_wav(sample_rate: u32, samples: &[AudioSample]) -> Result<Vec<u8>, AudioError> {
    if samples.is_empty() {
        return Err(AudioError::EmptyBuffer);
    }

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, pcm16_spec(sample_rate))?;
        for &sample in samples {
            writer.write_sample(to_pcm16(sample))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// A live stream of mono audio frames
pub struct AudioSource {
    pub format: AudioFormat,
    pub frames: mpsc::Receiver<Vec<AudioSample>>,
}

impl AudioSource {
    pub fn new(format: AudioFormat, frames: mpsc::Receiver<Vec<AudioSample>>) -> Self {
        Self { format, frames }
    }
}

/// Pre-recorded audio replayed as a frame stream
pub struct WavSource {
    format: AudioFormat,
    samples: Vec<AudioSample>,
}

impl WavSource {
    /// Load a WAV file (downmixed to mono)
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let (format, samples) = read_wav(path)?;
        Self::from_samples(format.sample_rate, samples)
    }

    /// Wrap mono samples already in memory
    pub fn from_samples(sample_rate: u32, samples: Vec<AudioSample>) -> Result<Self, AudioError> {
        let format = AudioFormat::mono(sample_rate);
        format.validate()?;
        if samples.is_empty() {
            return Err(AudioError::EmptyBuffer);
        }
        Ok(Self { format, samples })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.samples.len())
    }

    /// Stream the samples as frames of `frame_ms`.
    ///
    /// With `realtime` set, frames are paced at playback speed like a
    /// microphone; otherwise they are sent as fast as the receiver reads.
    /// Must be called from within a Tokio runtime.
    pub fn stream(self, frame_ms: u64, realtime: bool) -> AudioSource {
        let format = self.format;
        let frame_len = format
            .samples_for(Duration::from_millis(frame_ms.max(1)))
            .max(1);
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let frame_duration = format.duration_of(frame_len);
            for chunk in self.samples.chunks(frame_len) {
                if tx.send(chunk.to_vec()).await.is_err() {
                    trace!("Audio source receiver dropped");
                    break;
                }
                if realtime {
                    tokio::time::sleep(frame_duration).await;
                }
            }
        });

        AudioSource::new(format, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_format_validation() {
        assert!(AudioFormat::new(16000, 1).validate().is_ok());
        assert!(AudioFormat::new(0, 1).validate().is_err());
        assert!(AudioFormat::new(16000, 0).validate().is_err());
    }

    #[test]
    fn test_sample_duration_conversions() {
        let format = AudioFormat::mono(16000);
        assert_eq!(format.samples_for(Duration::from_millis(30)), 480);
        assert_eq!(format.samples_for(Duration::from_secs(5)), 80000);
        assert_relative_eq!(format.duration_of(8000).as_secs_f64(), 0.5);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let stereo: Vec<f32> = (0..1000).flat_map(|_| [0.5, 0.3]).collect();
        let mono = downmix_to_mono(&stereo, 2);

        assert_eq!(mono.len(), 1000);
        assert!(mono.iter().all(|&s| (s - 0.4).abs() < 1e-6));
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_wav_file_is_read_back_as_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let samples: Vec<f32> = (0..1600).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        write_wav(&path, 16000, &samples).unwrap();

        let (format, restored) = read_wav(&path).unwrap();
        assert_eq!(format, AudioFormat::mono(16000));
        assert_eq!(restored.len(), samples.len());
        for (a, b) in samples.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_encode_wav_has_riff_header() {
        let bytes = encode_wav(16000, &[0.0, 0.5, -0.5]).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert!(matches!(encode_wav(16000, &[]), Err(AudioError::EmptyBuffer)));
    }

    #[tokio::test]
    async fn test_wav_source_streams_all_samples() {
        let source = WavSource::from_samples(16000, vec![0.1; 1000]).unwrap();
        let mut stream = source.stream(30, false);

        let mut total = 0;
        let mut frames = 0;
        while let Some(frame) = stream.frames.recv().await {
            assert!(frame.len() <= 480);
            total += frame.len();
            frames += 1;
        }

        assert_eq!(total, 1000);
        assert_eq!(frames, 3);
    }
}
