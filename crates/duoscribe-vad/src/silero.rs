use voice_activity_detector::VoiceActivityDetector;

use crate::config::VadConfig;
use crate::{SpeechDetector, VadError};

#[derive(Copy, Clone, Default)]
struct I16Sample(i16);

impl voice_activity_detector::Sample for I16Sample {
    fn to_f32(self) -> f32 {
        self.0 as f32 / i16::MAX as f32
    }
}

/// The Silero model runs on fixed 512-sample windows at 16 kHz; smaller
/// chunks fail the crate's sample-rate/chunk-size ratio check at build time.
const SILERO_CHUNK_SAMPLES: usize = 512;

/// Silero ONNX classifier: one model inference per frame, speech when the
/// reported probability reaches the configured threshold.
pub struct SileroDetector {
    detector: VoiceActivityDetector,
    threshold: f32,
    sample_rate: u32,
}

impl SileroDetector {
    pub fn new(config: &VadConfig) -> Result<Self, VadError> {
        let detector = VoiceActivityDetector::builder()
            .sample_rate(config.sample_rate_hz as i64)
            .chunk_size(SILERO_CHUNK_SAMPLES)
            .build()
            .map_err(|e| VadError::Init(format!("Failed to create Silero VAD: {}", e)))?;

        Ok(Self {
            detector,
            threshold: config.silero_threshold,
            sample_rate: config.sample_rate_hz,
        })
    }
}

impl SpeechDetector for SileroDetector {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError> {
        if frame.len() != SILERO_CHUNK_SAMPLES {
            return Err(VadError::FrameSize {
                expected: SILERO_CHUNK_SAMPLES,
                got: frame.len(),
            });
        }

        let probability = self.detector.predict(frame.iter().map(|&s| I16Sample(s)));
        Ok(probability >= self.threshold)
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn required_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn required_frame_size_samples(&self) -> usize {
        SILERO_CHUNK_SAMPLES
    }
}
