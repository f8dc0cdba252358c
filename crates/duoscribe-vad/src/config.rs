use serde::{Deserialize, Serialize};

use crate::constants::SAMPLE_RATE_HZ;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VadMode {
    /// RMS-energy threshold classifier. Always available.
    Energy,
    /// Silero ONNX classifier, behind the `silero` feature.
    Silero,
}

impl Default for VadMode {
    fn default() -> Self {
        Self::Energy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    /// Frames at or above this level count as speech.
    pub speech_threshold_dbfs: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            speech_threshold_dbfs: -40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    pub mode: VadMode,
    pub energy: EnergyConfig,
    /// Silero speech probability threshold; unused in energy mode.
    pub silero_threshold: f32,
    pub sample_rate_hz: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            mode: VadMode::default(),
            energy: EnergyConfig::default(),
            silero_threshold: 0.5,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }
}
