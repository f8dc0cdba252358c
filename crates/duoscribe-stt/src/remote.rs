//! Remote Whisper backend: OpenAI-compatible `/audio/transcriptions`
//! endpoint, queried with `verbose_json` so per-segment no-speech
//! probabilities come back for the confidence gate.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::{AudioClip, SttError, Transcriber, Transcript, TranscriptSegment};

#[derive(Debug, Clone)]
pub struct RemoteWhisperConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// ISO 639-1 language hint; empty means let the service detect.
    pub language: String,
}

pub struct RemoteWhisperBackend {
    client: reqwest::Client,
    config: RemoteWhisperConfig,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscriptionResponse {
    #[serde(default)]
    segments: Vec<ResponseSegment>,
}

#[derive(Debug, Deserialize)]
struct ResponseSegment {
    text: String,
    no_speech_prob: Option<f32>,
}

impl RemoteWhisperBackend {
    pub fn new(config: RemoteWhisperConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn parse(body: &str) -> Result<Vec<TranscriptSegment>, SttError> {
        let response: VerboseTranscriptionResponse =
            serde_json::from_str(body).map_err(|e| SttError::Model(format!(
                "Unparseable transcription response: {}",
                e
            )))?;

        Ok(response
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                text: s.text,
                no_speech_prob: s.no_speech_prob,
            })
            .collect())
    }
}

#[async_trait]
impl Transcriber for RemoteWhisperBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, SttError> {
        let started = Instant::now();

        let wav_bytes = tokio::fs::read(clip.path()).await?;
        let file_part = Part::bytes(wav_bytes)
            .file_name("segment.wav")
            .mime_str("audio/wav")
            .map_err(SttError::Http)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json".to_string());
        if !self.config.language.is_empty() {
            form = form.text("language", self.config.language.clone());
        }

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SttError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let segments = Self::parse(&body)?;
        let elapsed = started.elapsed();
        tracing::debug!(
            segments = segments.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Remote transcription complete"
        );

        Ok(Transcript::new(segments, elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbose_json_segments() {
        let body = r#"{
            "task": "transcribe",
            "language": "japanese",
            "duration": 2.1,
            "text": "こんにちは",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.1, "text": "こんにちは",
                 "tokens": [1], "temperature": 0.0, "avg_logprob": -0.2,
                 "compression_ratio": 1.0, "no_speech_prob": 0.12}
            ]
        }"#;

        let segments = RemoteWhisperBackend::parse(body).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "こんにちは");
        assert!((segments[0].no_speech_prob.unwrap() - 0.12).abs() < 1e-6);
    }

    #[test]
    fn missing_segments_parse_as_empty() {
        let segments = RemoteWhisperBackend::parse(r#"{"text": "hi"}"#).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn garbage_body_is_a_model_error() {
        assert!(matches!(
            RemoteWhisperBackend::parse("not json"),
            Err(SttError::Model(_))
        ));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let backend = RemoteWhisperBackend::new(RemoteWhisperConfig {
            base_url: "https://api.example.com/v1/".to_string(),
            api_key: "k".to_string(),
            model: "whisper-1".to_string(),
            language: "ja".to_string(),
        });
        assert_eq!(
            backend.endpoint(),
            "https://api.example.com/v1/audio/transcriptions"
        );
    }
}
