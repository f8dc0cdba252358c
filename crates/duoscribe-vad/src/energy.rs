use crate::config::EnergyConfig;
use crate::{SpeechDetector, VadError};

/// Energy-threshold classifier: a frame is speech when its RMS level in
/// dBFS reaches the configured threshold. Crude next to an ML detector but
/// dependency-free and cheap enough for any frame period.
pub struct EnergyDetector {
    config: EnergyConfig,
}

impl EnergyDetector {
    pub fn new(config: EnergyConfig) -> Self {
        Self { config }
    }

    fn rms_dbfs(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return -100.0;
        }

        let sum_squares: i64 = frame
            .iter()
            .map(|&sample| {
                let s = sample as i64;
                s * s
            })
            .sum();

        let mean_square = sum_squares as f64 / frame.len() as f64;
        let rms = (mean_square.sqrt() / 32768.0) as f32;

        if rms <= 1e-10 {
            return -100.0;
        }
        20.0 * rms.log10()
    }
}

impl SpeechDetector for EnergyDetector {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError> {
        Ok(Self::rms_dbfs(frame) >= self.config.speech_threshold_dbfs)
    }

    fn reset(&mut self) {}
}
