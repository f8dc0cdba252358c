//! Transcription backend capability and shared audio-clip plumbing.

pub mod clip;
pub mod remote;
pub mod types;

pub use clip::{normalize_peak, AudioClip};
pub use remote::RemoteWhisperBackend;
pub use types::{Transcript, TranscriptSegment};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SttError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Model error: {0}")]
    Model(String),
}

/// A speech-to-text backend: given a finite audio clip, produce a
/// transcript. Calls may be slow (network round-trip or model inference)
/// and must never run on the capture path.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, SttError>;
}
