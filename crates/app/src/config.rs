use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use duoscribe_audio::SegmenterConfig;
use duoscribe_vad::{VadConfig, VadMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VadModeArg {
    Energy,
    Silero,
}

#[derive(Parser, Debug)]
#[command(
    name = "duoscribe",
    about = "Listens to the microphone and runs every detected utterance through two speech-to-text backends for comparison"
)]
pub struct Cli {
    /// Input device name; default input device when omitted.
    #[arg(long)]
    pub device: Option<String>,

    /// Language hint passed to both backends (ISO 639-1).
    #[arg(long, default_value = "ja")]
    pub language: String,

    /// API key for the remote transcription service.
    #[arg(long, env = "DUOSCRIBE_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible transcription API.
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    /// Remote model identifier.
    #[arg(long, default_value = "whisper-1")]
    pub remote_model: String,

    /// Path to the local GGML Whisper model.
    #[arg(long, env = "DUOSCRIBE_LOCAL_MODEL", default_value = "models/ggml-base.bin")]
    pub local_model: String,

    /// Directory for transcript logs and the application log.
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Voice activity detector to run per frame.
    #[arg(long, value_enum, default_value_t = VadModeArg::Energy)]
    pub vad_mode: VadModeArg,

    /// Consecutive silent frames that close an utterance.
    #[arg(long, default_value_t = 20)]
    pub silence_frames: u32,

    /// Utterances of this many frames or fewer are discarded as noise.
    #[arg(long, default_value_t = 20)]
    pub min_segment_frames: usize,
}

impl Cli {
    pub fn vad_config(&self) -> VadConfig {
        VadConfig {
            mode: match self.vad_mode {
                VadModeArg::Energy => VadMode::Energy,
                VadModeArg::Silero => VadMode::Silero,
            },
            ..VadConfig::default()
        }
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            silence_frames_threshold: self.silence_frames,
            min_segment_frames: self.min_segment_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_flow_into_segmenter_config() {
        let cli = Cli::parse_from([
            "duoscribe",
            "--api-key",
            "k",
            "--silence-frames",
            "35",
            "--min-segment-frames",
            "5",
        ]);
        let cfg = cli.segmenter_config();
        assert_eq!(cfg.silence_frames_threshold, 35);
        assert_eq!(cfg.min_segment_frames, 5);
    }

    #[test]
    fn defaults_match_pipeline_contract() {
        let cli = Cli::parse_from(["duoscribe", "--api-key", "k"]);
        assert_eq!(cli.language, "ja");
        assert_eq!(cli.segmenter_config().silence_frames_threshold, 20);
        assert_eq!(cli.vad_config().mode, VadMode::Energy);
    }
}
