//! Per-segment audio materialization: peak normalization and the scoped
//! temporary WAV handed to both backends.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::NamedTempFile;

use crate::SttError;

/// Scales samples so the largest absolute value maps to `i16::MAX`.
///
/// Returns `None` for an all-zero buffer: there is nothing to normalize and
/// scaling would divide by zero, so callers skip transcription entirely.
/// Applying this to an already-normalized buffer is a no-op.
pub fn normalize_peak(samples: &[i16]) -> Option<Vec<i16>> {
    let peak = samples.iter().map(|&s| (s as i32).abs()).max()?;
    if peak == 0 {
        return None;
    }

    Some(
        samples
            .iter()
            .map(|&s| (s as i32 * i16::MAX as i32 / peak) as i16)
            .collect(),
    )
}

/// A speech segment rendered as a 16 kHz mono 16-bit WAV in a named
/// temporary file. The file exists for exactly as long as the clip value
/// does; dropping the clip deletes it on every exit path.
pub struct AudioClip {
    file: NamedTempFile,
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Result<Self, SttError> {
        let file = tempfile::Builder::new()
            .prefix("duoscribe-")
            .suffix(".wav")
            .tempfile()?;

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(file.path(), spec)?;
        for &sample in &samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        Ok(Self {
            file,
            samples,
            sample_rate,
        })
    }

    /// Path of the backing WAV file, valid until the clip is dropped.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Samples as f32 in [-1.0, 1.0] for in-process model backends.
    pub fn samples_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }
}
