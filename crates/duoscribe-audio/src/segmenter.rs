use std::collections::VecDeque;
use std::time::Instant;

use crossbeam_channel::{Receiver, TryRecvError};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use duoscribe_vad::{SpeechDetector, VadError};

use crate::capture::CaptureFrame;

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Silence frames that must pass before a buffered utterance is closed.
    /// The close fires on the frame *after* this count is exceeded.
    pub silence_frames_threshold: u32,
    /// Buffers of this many frames or fewer are discarded as noise.
    pub min_segment_frames: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_frames_threshold: 20,
            min_segment_frames: 20,
        }
    }
}

/// A contiguous run of speech frames, closed by sufficient silence.
#[derive(Debug)]
pub struct SpeechSegment {
    /// Concatenated PCM of every speech-classified frame, in arrival order.
    pub samples: Vec<i16>,
    /// Number of frames the segment was built from.
    pub frames: usize,
    /// When the first frame of the segment arrived.
    pub captured_at: Instant,
}

/// Silence-run segmentation state machine.
///
/// Speech frames accumulate into the active buffer and zero the silence
/// counter; silence frames only count up. Once the counter exceeds the
/// threshold, a non-empty buffer is either emitted (if long enough) or
/// thrown away as noise. There is deliberately no upper bound on the
/// buffer: an utterance grows until the speaker pauses.
pub struct SpeechSegmenter {
    config: SegmenterConfig,
    silence_run: u32,
    buffer: Vec<i16>,
    frames_buffered: usize,
    started_at: Option<Instant>,
}

impl SpeechSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            silence_run: 0,
            buffer: Vec::new(),
            frames_buffered: 0,
            started_at: None,
        }
    }

    /// Feeds one classified frame; returns a completed segment when the
    /// trailing-silence edge closes one.
    pub fn push_frame(&mut self, frame: &[i16], is_speech: bool) -> Option<SpeechSegment> {
        if is_speech {
            self.silence_run = 0;
            if self.buffer.is_empty() {
                self.started_at = Some(Instant::now());
            }
            self.buffer.extend_from_slice(frame);
            self.frames_buffered += 1;
            return None;
        }

        self.silence_run += 1;

        if self.silence_run > self.config.silence_frames_threshold && self.frames_buffered > 0 {
            let samples = std::mem::take(&mut self.buffer);
            let frames = self.frames_buffered;
            self.frames_buffered = 0;
            let started_at = self.started_at.take().unwrap_or_else(Instant::now);

            if frames > self.config.min_segment_frames {
                return Some(SpeechSegment {
                    samples,
                    frames,
                    captured_at: started_at,
                });
            }

            tracing::debug!(frames, "Discarded sub-threshold speech buffer as noise");
        }

        None
    }

    pub fn frames_buffered(&self) -> usize {
        self.frames_buffered
    }
}

/// Bridges the capture channel to the segment queue: re-chunks raw capture
/// buffers into frames of the detector's required size, labels each with
/// the detector and runs the segmenter, pushing completed segments
/// downstream.
pub struct SegmenterTask {
    frame_rx: Receiver<CaptureFrame>,
    segment_tx: UnboundedSender<SpeechSegment>,
    detector: Box<dyn SpeechDetector>,
    config: SegmenterConfig,
}

impl SegmenterTask {
    pub fn new(
        frame_rx: Receiver<CaptureFrame>,
        segment_tx: UnboundedSender<SpeechSegment>,
        detector: Box<dyn SpeechDetector>,
        config: SegmenterConfig,
    ) -> Self {
        Self {
            frame_rx,
            segment_tx,
            detector,
            config,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let worker = SegmenterWorker::new(self);
        tokio::spawn(async move {
            worker.run().await;
        })
    }
}

struct SegmenterWorker {
    frame_rx: Receiver<CaptureFrame>,
    segment_tx: UnboundedSender<SpeechSegment>,
    detector: Box<dyn SpeechDetector>,
    segmenter: SpeechSegmenter,
    pending: VecDeque<i16>,
    frame_size: usize,
    frames_classified: u64,
    segments_emitted: u64,
}

impl SegmenterWorker {
    fn new(task: SegmenterTask) -> Self {
        // Frame size is dictated by the classifier, not configuration: the
        // Silero model only accepts its own window size.
        let frame_size = task.detector.required_frame_size_samples();
        Self {
            frame_rx: task.frame_rx,
            segment_tx: task.segment_tx,
            detector: task.detector,
            segmenter: SpeechSegmenter::new(task.config),
            pending: VecDeque::with_capacity(frame_size * 4),
            frame_size,
            frames_classified: 0,
            segments_emitted: 0,
        }
    }

    async fn run(mut self) {
        tracing::info!("Segmenter task started");

        loop {
            match self.frame_rx.try_recv() {
                Ok(frame) => {
                    self.pending.extend(downmix_to_mono(&frame));
                    if let Err(e) = self.classify_ready() {
                        // No frame can be labeled once the classifier faults;
                        // treat as fatal to capture and let main tear down.
                        tracing::error!("Classifier fault, aborting capture path: {}", e);
                        break;
                    }
                }
                Err(TryRecvError::Empty) => {
                    time::sleep(Duration::from_millis(1)).await;
                }
                Err(TryRecvError::Disconnected) => break,
            }
        }

        // Any partially accumulated buffer is dropped here, not flushed.
        tracing::info!(
            "Segmenter task stopped. Frames classified: {}, segments emitted: {}, frames unflushed: {}",
            self.frames_classified,
            self.segments_emitted,
            self.segmenter.frames_buffered(),
        );
    }

    fn classify_ready(&mut self) -> Result<(), VadError> {
        while self.pending.len() >= self.frame_size {
            let frame: Vec<i16> = self.pending.drain(..self.frame_size).collect();

            let is_speech = self.detector.is_speech(&frame)?;
            self.frames_classified += 1;

            if let Some(segment) = self.segmenter.push_frame(&frame, is_speech) {
                self.segments_emitted += 1;
                tracing::debug!(
                    frames = segment.frames,
                    samples = segment.samples.len(),
                    "Speech segment emitted"
                );
                if self.segment_tx.send(segment).is_err() {
                    // Consumer is gone; keep capture alive and drop the
                    // segment rather than stalling the audio path.
                    tracing::warn!("Segment queue closed, dropping segment");
                }
            }
        }
        Ok(())
    }
}

fn downmix_to_mono(frame: &CaptureFrame) -> Vec<i16> {
    if frame.channels <= 1 {
        return frame.samples.clone();
    }

    let channels = frame.channels as usize;
    frame
        .samples
        .chunks_exact(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use duoscribe_vad::{FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};

    const FRAME: usize = FRAME_SIZE_SAMPLES;

    fn speech_frame() -> Vec<i16> {
        vec![8000i16; FRAME]
    }

    fn silence_frame() -> Vec<i16> {
        vec![0i16; FRAME]
    }

    fn feed(seg: &mut SpeechSegmenter, speech: usize, silence: usize) -> Vec<SpeechSegment> {
        let mut out = Vec::new();
        for _ in 0..speech {
            if let Some(s) = seg.push_frame(&speech_frame(), true) {
                out.push(s);
            }
        }
        for _ in 0..silence {
            if let Some(s) = seg.push_frame(&silence_frame(), false) {
                out.push(s);
            }
        }
        out
    }

    #[test]
    fn emits_one_segment_above_threshold() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        let emitted = feed(&mut seg, 30, 25);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].frames, 30);
        assert_eq!(emitted[0].samples.len(), 30 * FRAME);
    }

    #[test]
    fn discards_short_segment_as_noise() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        let emitted = feed(&mut seg, 10, 25);
        assert!(emitted.is_empty());
        assert_eq!(seg.frames_buffered(), 0);
    }

    #[test]
    fn boundary_length_is_still_noise() {
        // Emission requires strictly more than min_segment_frames.
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        assert!(feed(&mut seg, 20, 25).is_empty());

        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        assert_eq!(feed(&mut seg, 21, 25).len(), 1);
    }

    #[test]
    fn silence_edge_is_strictly_greater_than_threshold() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        // 20 silence frames: counter == threshold, no emission yet.
        assert!(feed(&mut seg, 30, 20).is_empty());
        // The 21st silence frame crosses the edge.
        let segment = seg.push_frame(&silence_frame(), false);
        assert_eq!(segment.unwrap().frames, 30);
    }

    #[test]
    fn short_silence_does_not_split_an_utterance() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        assert!(feed(&mut seg, 15, 20).is_empty());
        // Speech resumes before the edge: counter resets, same segment.
        assert!(feed(&mut seg, 15, 0).is_empty());
        let emitted = feed(&mut seg, 0, 21);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].frames, 30);
    }

    #[test]
    fn no_emission_without_any_speech() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        assert!(feed(&mut seg, 0, 100).is_empty());
    }

    #[test]
    fn continued_silence_after_emission_emits_nothing_further() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        assert_eq!(feed(&mut seg, 30, 25).len(), 1);
        assert!(feed(&mut seg, 0, 50).is_empty());
    }

    #[test]
    fn back_to_back_utterances_emit_in_order() {
        let mut seg = SpeechSegmenter::new(SegmenterConfig::default());
        let mut emitted = feed(&mut seg, 30, 25);
        emitted.extend(feed(&mut seg, 40, 25));
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].frames, 30);
        assert_eq!(emitted[1].frames, 40);
    }

    struct FirstSampleDetector;

    impl SpeechDetector for FirstSampleDetector {
        fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError> {
            Ok(frame.first().copied().unwrap_or(0) != 0)
        }

        fn reset(&mut self) {}
    }

    struct FaultingDetector;

    impl SpeechDetector for FaultingDetector {
        fn is_speech(&mut self, _frame: &[i16]) -> Result<bool, VadError> {
            Err(VadError::Detector("vad backend rejected frame".into()))
        }

        fn reset(&mut self) {}
    }

    fn capture_frame(samples: Vec<i16>) -> CaptureFrame {
        CaptureFrame {
            samples,
            sample_rate: SAMPLE_RATE_HZ,
            channels: 1,
            timestamp: Instant::now(),
        }
    }

    #[tokio::test]
    async fn worker_segments_a_captured_utterance() {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(256);
        let (segment_tx, mut segment_rx) = tokio::sync::mpsc::unbounded_channel();

        let task = SegmenterTask::new(
            frame_rx,
            segment_tx,
            Box::new(FirstSampleDetector),
            SegmenterConfig::default(),
        );
        let handle = task.spawn();

        // 30 speech frames then 25 silence frames, delivered as odd-sized
        // capture buffers to exercise re-chunking.
        let mut samples = vec![8000i16; 30 * FRAME];
        samples.extend(vec![0i16; 25 * FRAME]);
        for chunk in samples.chunks(333) {
            frame_tx.send(capture_frame(chunk.to_vec())).unwrap();
        }
        drop(frame_tx);
        handle.await.unwrap();

        let segment = segment_rx.recv().await.expect("expected one segment");
        assert_eq!(segment.frames, 30);
        assert!(segment_rx.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_downmixes_stereo_input() {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(16);
        let (segment_tx, mut segment_rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = SegmenterTask::new(
            frame_rx,
            segment_tx,
            Box::new(FirstSampleDetector),
            SegmenterConfig::default(),
        )
        .spawn();

        // Stereo, both channels equal: downmix must preserve sample values.
        let mut interleaved = Vec::new();
        for _ in 0..(25 * FRAME) {
            interleaved.push(8000i16);
            interleaved.push(8000i16);
        }
        let mut frame = capture_frame(interleaved);
        frame.channels = 2;
        frame_tx.send(frame).unwrap();
        for _ in 0..25 {
            let mut silence = capture_frame(vec![0i16; FRAME * 2]);
            silence.channels = 2;
            frame_tx.send(silence).unwrap();
        }
        drop(frame_tx);
        handle.await.unwrap();

        let segment = segment_rx.recv().await.expect("expected one segment");
        assert_eq!(segment.frames, 25);
        assert!(segment.samples.iter().all(|&s| s == 8000));
    }

    #[tokio::test]
    async fn worker_stops_on_classifier_fault() {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(16);
        let (segment_tx, mut segment_rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = SegmenterTask::new(
            frame_rx,
            segment_tx,
            Box::new(FaultingDetector),
            SegmenterConfig::default(),
        )
        .spawn();

        frame_tx.send(capture_frame(vec![8000i16; FRAME])).unwrap();
        handle.await.unwrap();

        assert!(segment_rx.recv().await.is_none());
    }

    /// Classifies like `FirstSampleDetector` but only accepts 512-sample
    /// frames, the way the Silero model does.
    struct WideFrameDetector;

    impl SpeechDetector for WideFrameDetector {
        fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError> {
            if frame.len() != 512 {
                return Err(VadError::FrameSize {
                    expected: 512,
                    got: frame.len(),
                });
            }
            Ok(frame.first().copied().unwrap_or(0) != 0)
        }

        fn reset(&mut self) {}

        fn required_frame_size_samples(&self) -> usize {
            512
        }
    }

    #[tokio::test]
    async fn worker_chunks_by_detector_required_frame_size() {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(512);
        let (segment_tx, mut segment_rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = SegmenterTask::new(
            frame_rx,
            segment_tx,
            Box::new(WideFrameDetector),
            SegmenterConfig::default(),
        )
        .spawn();

        // 30 speech frames then 25 silence frames at the detector's 512
        // window, delivered as odd-sized capture buffers.
        let mut samples = vec![8000i16; 30 * 512];
        samples.extend(vec![0i16; 25 * 512]);
        for chunk in samples.chunks(333) {
            frame_tx.send(capture_frame(chunk.to_vec())).unwrap();
        }
        drop(frame_tx);
        handle.await.unwrap();

        let segment = segment_rx.recv().await.expect("expected one segment");
        assert_eq!(segment.frames, 30);
        assert_eq!(segment.samples.len(), 30 * 512);
    }
}
