use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::Sender;

use duoscribe_foundation::AudioError;
use duoscribe_vad::SAMPLE_RATE_HZ;

/// One cpal callback's worth of raw input audio.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: Instant,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub frames_captured: AtomicU64,
    pub frames_dropped: AtomicU64,
}

/// Dedicated OS thread that owns the cpal stream.
///
/// cpal streams are not `Send`, so the stream lives and dies on this thread.
/// The audio callback itself does no work beyond format conversion and a
/// `try_send` into the bounded channel; a full channel drops the frame
/// rather than stalling the device callback.
pub struct CaptureThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl CaptureThread {
    /// Opens the requested (or default) input device and starts capturing.
    /// Returns once the stream is playing; the negotiated stream config is
    /// reported back so callers can verify the 16 kHz contract.
    pub fn spawn(
        device_name: Option<String>,
        frame_tx: Sender<CaptureFrame>,
    ) -> Result<(Self, StreamConfig), AudioError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(CaptureStats::default());

        let thread_shutdown = Arc::clone(&shutdown);
        let thread_stats = Arc::clone(&stats);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<StreamConfig, AudioError>>();

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), frame_tx, thread_stats) {
                    Ok((stream, config)) => {
                        let _ = ready_tx.send(Ok(config));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while !thread_shutdown.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                }

                drop(stream);
                tracing::info!("Audio capture thread stopped");
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(config)) => Ok((
                Self {
                    handle,
                    shutdown,
                    stats,
                },
                config,
            )),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::Fatal(
                    "Capture thread exited before reporting stream state".to_string(),
                ))
            }
        }
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.frames_captured.load(Ordering::Relaxed),
            self.stats.frames_dropped.load(Ordering::Relaxed),
        )
    }

    /// Stops the stream and joins the capture thread. Any audio still in
    /// flight past the channel is dropped, not flushed.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

fn open_stream(
    device_name: Option<&str>,
    frame_tx: Sender<CaptureFrame>,
    stats: Arc<CaptureStats>,
) -> Result<(cpal::Stream, StreamConfig), AudioError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound {
                name: Some(name.to_string()),
            })?,
        None => host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound { name: None })?,
    };
    tracing::info!("Opening audio device: {}", device.name()?);

    let (config, sample_format) = negotiate_config(&device)?;
    tracing::info!("Audio config: {:?} ({:?})", config, sample_format);

    let err_fn = |err| {
        tracing::error!("Audio stream error: {}", err);
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let cb_config = config.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &_| {
                    deliver(data.to_vec(), &cb_config, &frame_tx, &stats);
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::F32 => {
            let cb_config = config.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &_| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    deliver(samples, &cb_config, &frame_tx, &stats);
                },
                err_fn,
                None,
            )?
        }
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", other),
            })
        }
    };

    stream.play()?;
    Ok((stream, config))
}

fn deliver(
    samples: Vec<i16>,
    config: &StreamConfig,
    frame_tx: &Sender<CaptureFrame>,
    stats: &CaptureStats,
) {
    let frame = CaptureFrame {
        samples,
        sample_rate: config.sample_rate.0,
        channels: config.channels,
        timestamp: Instant::now(),
    };

    match frame_tx.try_send(frame) {
        Ok(_) => {
            stats.frames_captured.fetch_add(1, Ordering::Relaxed);
        }
        Err(_) => {
            stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Picks an input config at the pipeline sample rate, preferring mono i16.
/// No resampling downstream: a device that cannot deliver 16 kHz is refused.
fn negotiate_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let mut fallback: Option<(StreamConfig, SampleFormat)> = None;

    for supported in device.supported_input_configs()? {
        if supported.min_sample_rate().0 > SAMPLE_RATE_HZ
            || supported.max_sample_rate().0 < SAMPLE_RATE_HZ
        {
            continue;
        }

        let config = StreamConfig {
            channels: supported.channels().clamp(1, 2),
            sample_rate: cpal::SampleRate(SAMPLE_RATE_HZ),
            buffer_size: cpal::BufferSize::Default,
        };

        match supported.sample_format() {
            SampleFormat::I16 => return Ok((config, SampleFormat::I16)),
            SampleFormat::F32 => {
                fallback.get_or_insert((config, SampleFormat::F32));
            }
            _ => {}
        }
    }

    fallback.ok_or_else(|| AudioError::FormatNotSupported {
        format: format!("no i16/f32 input config at {} Hz", SAMPLE_RATE_HZ),
    })
}
