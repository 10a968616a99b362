//! Impulse-response loading for the convolution reverb.

use std::io::Cursor;
use std::path::Path;

use crate::error::ImpulseError;

/// A decoded impulse response, mixed down to mono.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl ImpulseResponse {
    /// Decode WAV bytes (integer or float PCM, any channel count).
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, ImpulseError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        if samples.is_empty() {
            return Err(ImpulseError::Empty);
        }

        Ok(ImpulseResponse {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Read and decode a WAV file from disk.
    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self, ImpulseError> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| ImpulseError::Io(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_wav_bytes(&bytes)
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// The response at `target_rate`, linearly interpolated.
    pub fn resampled(&self, target_rate: u32) -> Vec<f32> {
        if target_rate == self.sample_rate || self.samples.len() < 2 {
            return self.samples.clone();
        }
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = ((self.samples.len() as f64) / ratio).round().max(1.0) as usize;
        (0..out_len)
            .map(|i| read_interpolated(&self.samples, i as f64 * ratio))
            .collect()
    }
}

fn read_interpolated(data: &[f32], position: f64) -> f32 {
    let idx = position as usize;
    if idx + 1 >= data.len() {
        return data.get(idx).copied().unwrap_or(0.0);
    }
    let frac = (position - idx as f64) as f32;
    data[idx] * (1.0 - frac) + data[idx + 1] * frac
}
