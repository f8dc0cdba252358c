//! Local in-process transcription backend over whisper.cpp.
//!
//! Supplies comparison text only: unlike the remote service it reports no
//! no-speech probability, so it never participates in the confidence gate.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use duoscribe_stt::{AudioClip, SttError, Transcriber, Transcript, TranscriptSegment};

pub struct LocalWhisperBackend {
    ctx: Arc<WhisperContext>,
    language: Option<String>,
}

impl LocalWhisperBackend {
    /// Loads a GGML Whisper model from disk. Loading happens once; each
    /// transcription creates a fresh inference state.
    pub fn new(model_path: &str, language: Option<String>) -> Result<Self, SttError> {
        info!(model_path, "Loading local Whisper model");
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| {
                SttError::Model(format!("Failed to load Whisper model '{}': {}", model_path, e))
            })?;
        info!("Local Whisper model loaded");

        Ok(Self {
            ctx: Arc::new(ctx),
            language,
        })
    }
}

#[async_trait]
impl Transcriber for LocalWhisperBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, SttError> {
        let started = Instant::now();
        let audio = clip.samples_f32();
        let language = self.language.clone();
        let ctx = Arc::clone(&self.ctx);

        // Inference is CPU-bound and blocking; keep it off the async runtime.
        let segments = tokio::task::spawn_blocking(move || -> Result<Vec<TranscriptSegment>, SttError> {
            let mut state = ctx
                .create_state()
                .map_err(|e| SttError::Model(format!("Failed to create Whisper state: {}", e)))?;

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            match language.as_deref() {
                Some(lang) => params.set_language(Some(lang)),
                None => params.set_detect_language(true),
            }
            params.set_translate(false);
            params.set_print_progress(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_suppress_blank(true);

            state
                .full(params, &audio)
                .map_err(|e| SttError::Model(format!("Whisper inference failed: {}", e)))?;

            let n_segments = state.full_n_segments();
            let mut segments = Vec::with_capacity(n_segments as usize);
            for i in 0..n_segments {
                if let Some(segment) = state.get_segment(i) {
                    if let Ok(text) = segment.to_str() {
                        segments.push(TranscriptSegment {
                            text: text.to_string(),
                            no_speech_prob: None,
                        });
                    }
                }
            }
            Ok(segments)
        })
        .await
        .map_err(|e| SttError::Model(format!("Whisper task join error: {}", e)))??;

        let elapsed = started.elapsed();
        debug!(
            segments = segments.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Local transcription complete"
        );

        Ok(Transcript::new(segments, elapsed))
    }
}
