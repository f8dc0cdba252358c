//! Audio constants shared across the classification pipeline

/// Sample rate all classification runs at (Hz)
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Classifier frame size (samples)
/// At 16kHz, 480 samples = 30ms frames (webrtc-style frame family)
pub const FRAME_SIZE_SAMPLES: usize = 480;

/// Mono input only
pub const CHANNELS_MONO: u16 = 1;

/// Frame duration in milliseconds (derived constant)
pub const FRAME_DURATION_MS: f32 = (FRAME_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;
