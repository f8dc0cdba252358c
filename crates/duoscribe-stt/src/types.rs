//! Transcript result types shared by all backends.

use std::time::Duration;

/// One span of transcribed text as reported by a backend.
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub text: String,
    /// Backend-reported probability that the span contains no speech.
    /// Backends that do not estimate this leave it `None`.
    pub no_speech_prob: Option<f32>,
}

/// A backend's complete answer for one audio clip.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    /// Wall-clock time the backend call took.
    pub elapsed: Duration,
}

impl Transcript {
    pub fn new(segments: Vec<TranscriptSegment>, elapsed: Duration) -> Self {
        Self { segments, elapsed }
    }

    /// Mean no-speech probability across all segments.
    ///
    /// `None` when the transcript is empty or the backend reports no
    /// probabilities (signalled by the first segment carrying none).
    pub fn avg_no_speech_prob(&self) -> Option<f32> {
        let first = self.segments.first()?;
        first.no_speech_prob?;

        let sum: f32 = self
            .segments
            .iter()
            .filter_map(|s| s.no_speech_prob)
            .sum();
        Some(sum / self.segments.len() as f32)
    }

    /// All segment texts concatenated, with embedded newlines stripped so
    /// one transcript always occupies one log line.
    pub fn joined_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<String>()
            .replace('\n', "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, prob: Option<f32>) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            no_speech_prob: prob,
        }
    }

    #[test]
    fn avg_prob_is_mean_of_segments() {
        let t = Transcript::new(
            vec![seg("a", Some(0.2)), seg("b", Some(0.4))],
            Duration::ZERO,
        );
        let avg = t.avg_no_speech_prob().unwrap();
        assert!((avg - 0.3).abs() < 1e-6);
    }

    #[test]
    fn avg_prob_none_when_empty() {
        let t = Transcript::new(vec![], Duration::ZERO);
        assert!(t.avg_no_speech_prob().is_none());
    }

    #[test]
    fn avg_prob_none_when_backend_reports_none() {
        let t = Transcript::new(vec![seg("a", None), seg("b", None)], Duration::ZERO);
        assert!(t.avg_no_speech_prob().is_none());
    }

    #[test]
    fn joined_text_concatenates_and_strips_newlines() {
        let t = Transcript::new(
            vec![seg("こんに\nちは", Some(0.1)), seg("、世界", Some(0.1))],
            Duration::ZERO,
        );
        assert_eq!(t.joined_text(), "こんにちは、世界");
    }
}
