pub mod config;
pub mod constants;
pub mod energy;
#[cfg(feature = "silero")]
pub mod silero;

pub use config::{EnergyConfig, VadConfig, VadMode};
pub use constants::{FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
pub use energy::EnergyDetector;
#[cfg(feature = "silero")]
pub use silero::SileroDetector;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VadError {
    #[error("Detector initialization failed: {0}")]
    Init(String),

    #[error("Frame size mismatch: expected {expected} samples, got {got}")]
    FrameSize { expected: usize, got: usize },

    #[error("Detector failure: {0}")]
    Detector(String),
}

/// Per-frame speech/silence classifier.
///
/// Implementations label one fixed-size frame at a time and must stay well
/// inside a single frame period; anything slower belongs off the audio path.
pub trait SpeechDetector: Send {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError>;
    fn reset(&mut self);
    fn required_sample_rate(&self) -> u32 {
        SAMPLE_RATE_HZ
    }
    fn required_frame_size_samples(&self) -> usize {
        FRAME_SIZE_SAMPLES
    }
}

/// Builds the detector selected by `config.mode`.
pub fn build_detector(config: &VadConfig) -> Result<Box<dyn SpeechDetector>, VadError> {
    match config.mode {
        VadMode::Energy => Ok(Box::new(EnergyDetector::new(config.energy.clone()))),
        #[cfg(feature = "silero")]
        VadMode::Silero => Ok(Box::new(SileroDetector::new(config)?)),
        #[cfg(not(feature = "silero"))]
        VadMode::Silero => Err(VadError::Init(
            "Silero VAD requested but this build lacks the `silero` feature".to_string(),
        )),
    }
}
