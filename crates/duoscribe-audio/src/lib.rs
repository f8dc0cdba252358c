pub mod capture;
pub mod segmenter;

pub use capture::{CaptureFrame, CaptureStats, CaptureThread};
pub use segmenter::{SegmenterConfig, SegmenterTask, SpeechSegment, SpeechSegmenter};
