use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use duoscribe_audio::SpeechSegment;
use duoscribe_stt::{normalize_peak, AudioClip, Transcriber, Transcript};

use crate::transcript_log::TranscriptLog;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Remote average no-speech probability must be strictly below this
    /// for a segment's results to be delivered.
    pub gate_threshold: f32,
    pub sample_rate: u32,
    /// Print color-tagged results to the terminal.
    pub console_output: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            gate_threshold: 0.5,
            sample_rate: duoscribe_vad::SAMPLE_RATE_HZ,
            console_output: true,
        }
    }
}

/// Drains the segment queue and drives each segment through both backends.
///
/// Segments are processed strictly one at a time: both transcriptions must
/// finish (or fail) before the per-segment WAV is released and the next
/// segment is dequeued, so delivery and log order always match emission
/// order.
pub struct DualTranscriber {
    segment_rx: UnboundedReceiver<SpeechSegment>,
    remote: Arc<dyn Transcriber>,
    local: Arc<dyn Transcriber>,
    remote_log: TranscriptLog,
    local_log: TranscriptLog,
    config: OrchestratorConfig,
    segments_seen: u64,
    segments_delivered: u64,
}

impl DualTranscriber {
    pub fn new(
        segment_rx: UnboundedReceiver<SpeechSegment>,
        remote: Arc<dyn Transcriber>,
        local: Arc<dyn Transcriber>,
        remote_log: TranscriptLog,
        local_log: TranscriptLog,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            segment_rx,
            remote,
            local,
            remote_log,
            local_log,
            config,
            segments_seen: 0,
            segments_delivered: 0,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    pub async fn run(mut self) {
        tracing::info!("Dual transcriber started");

        while let Some(segment) = self.segment_rx.recv().await {
            self.segments_seen += 1;
            self.process_segment(segment).await;
        }

        tracing::info!(
            "Dual transcriber stopped. Segments: {} seen, {} delivered",
            self.segments_seen,
            self.segments_delivered
        );
    }

    async fn process_segment(&mut self, segment: SpeechSegment) {
        // All-zero audio cannot be peak-normalized; skip it outright
        // instead of handing the backends a degenerate clip.
        let Some(samples) = normalize_peak(&segment.samples) else {
            tracing::debug!(frames = segment.frames, "Skipping zero-amplitude segment");
            return;
        };

        let clip = match AudioClip::from_samples(samples, self.config.sample_rate) {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!("Failed to materialize segment clip: {}", e);
                return;
            }
        };

        tracing::debug!(
            frames = segment.frames,
            duration_secs = clip.duration_secs(),
            queued_for_ms = segment.captured_at.elapsed().as_millis() as u64,
            "Transcribing segment"
        );

        // Both backends run on the same clip; the temp WAV is dropped only
        // after both have returned, pass or fail.
        let (remote_result, local_result) = tokio::join!(
            self.remote.transcribe(&clip),
            self.local.transcribe(&clip),
        );
        drop(clip);

        let remote = match remote_result {
            Ok(transcript) => transcript,
            Err(e) => {
                // Without the remote estimate the gate cannot pass.
                tracing::warn!("{} backend failed, segment dropped: {}", self.remote.name(), e);
                if let Err(e) = &local_result {
                    tracing::warn!("{} backend also failed: {}", self.local.name(), e);
                }
                return;
            }
        };

        if !self.gate_passes(&remote) {
            return;
        }

        // Local line first, then remote.
        match local_result {
            Ok(local) => {
                let local_text = local.joined_text();
                self.deliver(self.local.name(), &local_text, "\x1b[31m");
                if let Err(e) = self.local_log.append(&local_text) {
                    tracing::warn!("Failed to write local transcript log: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "{} backend failed, delivering remote text only: {}",
                    self.local.name(),
                    e
                );
            }
        }

        let remote_text = remote.joined_text();
        self.deliver(self.remote.name(), &remote_text, "\x1b[32m");
        if let Err(e) = self.remote_log.append(&remote_text) {
            tracing::warn!("Failed to write remote transcript log: {}", e);
        }

        self.segments_delivered += 1;
    }

    fn gate_passes(&self, remote: &Transcript) -> bool {
        match remote.avg_no_speech_prob() {
            Some(prob) if prob < self.config.gate_threshold => {
                tracing::debug!(no_speech_prob = prob, "Confidence gate passed");
                true
            }
            Some(prob) => {
                tracing::debug!(no_speech_prob = prob, "Confidence gate rejected segment");
                false
            }
            None => {
                tracing::debug!("No no-speech estimate from remote, segment dropped");
                false
            }
        }
    }

    fn deliver(&self, backend: &str, text: &str, color: &str) {
        if self.config.console_output {
            println!("{}{}: {}\x1b[0m", color, backend.to_uppercase(), text);
        }
    }
}
