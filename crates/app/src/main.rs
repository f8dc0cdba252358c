use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use duoscribe_app::config::Cli;
use duoscribe_app::orchestrator::{DualTranscriber, OrchestratorConfig};
use duoscribe_app::transcript_log::TranscriptLog;
use duoscribe_audio::{CaptureThread, SegmenterTask};
use duoscribe_foundation::StopSignal;
use duoscribe_stt::remote::RemoteWhisperConfig;
use duoscribe_stt::{RemoteWhisperBackend, Transcriber};

fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "duoscribe.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[cfg(feature = "whisper")]
fn build_local_backend(cli: &Cli) -> anyhow::Result<Arc<dyn Transcriber>> {
    let backend = duoscribe_stt_whisper::LocalWhisperBackend::new(
        &cli.local_model,
        Some(cli.language.clone()),
    )?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "whisper"))]
fn build_local_backend(_cli: &Cli) -> anyhow::Result<Arc<dyn Transcriber>> {
    anyhow::bail!("this build has no local transcription backend; rebuild with --features whisper")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_dir)?;
    tracing::info!("Starting duoscribe");

    let stop = StopSignal::install();

    // --- Backends ---
    let remote: Arc<dyn Transcriber> = Arc::new(RemoteWhisperBackend::new(RemoteWhisperConfig {
        base_url: cli.api_base.clone(),
        api_key: cli.api_key.clone(),
        model: cli.remote_model.clone(),
        language: cli.language.clone(),
    }));
    let local = build_local_backend(&cli)?;

    let remote_log = TranscriptLog::open(&cli.log_dir.join("remote.log"))
        .context("opening remote transcript log")?;
    let local_log = TranscriptLog::open(&cli.log_dir.join("local.log"))
        .context("opening local transcript log")?;

    // --- Capture ---
    // ~3 seconds of 30ms device callbacks; overflow drops frames rather
    // than blocking the audio thread.
    let (frame_tx, frame_rx) = crossbeam_channel::bounded(100);
    let (segment_tx, segment_rx) = tokio::sync::mpsc::unbounded_channel();

    let (capture, stream_config) = CaptureThread::spawn(cli.device.clone(), frame_tx)?;
    tracing::info!("Audio capture started: {:?}", stream_config);

    // --- Segmenter ---
    let detector = duoscribe_vad::build_detector(&cli.vad_config()).map_err(|e| anyhow!(e))?;
    let mut segmenter_handle =
        SegmenterTask::new(frame_rx, segment_tx, detector, cli.segmenter_config()).spawn();
    tracing::info!("Segmenter task started");

    // --- Orchestrator ---
    let orchestrator_handle = DualTranscriber::new(
        segment_rx,
        remote,
        local,
        remote_log,
        local_log,
        OrchestratorConfig::default(),
    )
    .spawn();
    tracing::info!("Dual transcriber task started");

    // --- Interactive loop ---
    println!("Listening... press Enter on an empty line to stop.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut segmenter_done = false;

    loop {
        tokio::select! {
            _ = stop.wait() => break,
            result = &mut segmenter_handle, if !segmenter_done => {
                // The segmenter only exits on its own when the classifier
                // faults; no frame can be labeled, so capture is over.
                segmenter_done = true;
                tracing::error!("Segmenter task exited: {:?}", result);
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(input)) if !input.trim().is_empty() => {
                        println!("Still listening; empty line stops.");
                    }
                    _ => break,
                }
            }
        }
    }

    // --- Graceful shutdown ---
    tracing::info!(
        interrupted = stop.interrupted(),
        "Beginning graceful shutdown"
    );
    let (captured, dropped) = capture.stats();
    tracing::info!("Capture stats: {} frames captured, {} dropped", captured, dropped);

    // Stopping capture drops the frame sender; the segmenter drains and
    // exits, which closes the segment queue and stops the orchestrator.
    capture.stop();
    if !segmenter_done {
        let _ = segmenter_handle.await;
    }
    let _ = orchestrator_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
