//! Capture thread.
//!
//! Overlaps acquisition and preprocessing with model updates. A single worker
//! owns the source and the preprocessor and hands preprocessed frames to the
//! driver over a bounded channel:
//!
//! - one producer and a FIFO channel, so frames arrive in capture order,
//! - the driver calls `MotionPipeline::process` for one frame at a time,
//! - `stop` is checked between frames only; a frame is either delivered whole
//!   or not at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use super::source::{CaptureSource, SourceStats};
use crate::frame::GrayFrame;
use crate::preprocess::Preprocessor;

/// A preprocessed frame tagged with its capture sequence number.
#[derive(Debug)]
pub struct PreparedFrame {
    pub sequence: u64,
    /// When the source produced the frame, before preprocessing and queueing.
    pub captured_at: Instant,
    pub frame: GrayFrame,
}

/// Handle to the capture worker.
pub struct CaptureThread {
    frames: Receiver<Result<PreparedFrame>>,
    shutdown: Arc<AtomicBool>,
    join: JoinHandle<SourceStats>,
}

impl CaptureThread {
    /// Start capturing from an already connected `source`.
    ///
    /// At most `depth` frames are buffered ahead of the driver. When
    /// `frame_interval` is set the worker paces capture to it. The first capture
    /// error is forwarded to the driver and ends the worker.
    pub fn spawn(
        mut source: CaptureSource,
        preprocessor: Preprocessor,
        depth: usize,
        frame_interval: Option<Duration>,
    ) -> Self {
        let (tx, rx) = sync_channel(depth.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();

        let join = std::thread::spawn(move || {
            let mut next_due = Instant::now();
            while !shutdown_thread.load(Ordering::SeqCst) {
                if let Some(interval) = frame_interval {
                    let now = Instant::now();
                    if next_due > now {
                        std::thread::sleep(next_due - now);
                    }
                    next_due = Instant::now() + interval;
                }
                let message = source.next_frame().map(|captured| PreparedFrame {
                    sequence: captured.sequence,
                    captured_at: captured.captured_at(),
                    frame: preprocessor.apply(&captured),
                });
                let failed = message.is_err();
                if tx.send(message).is_err() || failed {
                    break;
                }
            }
            let stats = source.stats();
            log::debug!(
                "capture thread stopped after {} frames from {}",
                stats.frames_captured,
                stats.url
            );
            stats
        });

        Self {
            frames: rx,
            shutdown,
            join,
        }
    }

    /// Next frame in capture order. `None` once the worker has exited.
    pub fn recv(&self) -> Option<Result<PreparedFrame>> {
        self.frames.recv().ok()
    }

    /// Wait up to `timeout` for the next frame.
    ///
    /// `Ok(None)` means nothing arrived in time. Capture errors, and a worker
    /// that has exited, are reported as `Err`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<PreparedFrame>> {
        match self.frames.recv_timeout(timeout) {
            Ok(message) => message.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("capture thread exited")),
        }
    }

    /// Ask the worker to stop after its current frame and wait for it.
    pub fn stop(self) -> Result<SourceStats> {
        let CaptureThread {
            frames,
            shutdown,
            join,
        } = self;
        shutdown.store(true, Ordering::SeqCst);
        // unblocks a worker waiting on a full channel
        drop(frames);
        join.join()
            .map_err(|_| anyhow!("capture thread panicked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameDims;
    use crate::ingest::source::SourceConfig;

    fn connected_source(max_frames: Option<u64>) -> CaptureSource {
        let mut source = CaptureSource::new(SourceConfig {
            url: "stub://capture-test".to_string(),
            width: 32,
            height: 24,
            target_fps: 10,
            max_frames,
        })
        .expect("source");
        source.connect().expect("connect");
        source
    }

    #[test]
    fn frames_arrive_in_capture_order() {
        let pre = Preprocessor::new(FrameDims::new(32, 24), 2).unwrap();
        let capture = CaptureThread::spawn(connected_source(Some(12)), pre, 2, None);

        let mut sequences = Vec::new();
        let mut last_captured: Option<Instant> = None;
        while let Some(message) = capture.recv() {
            match message {
                Ok(prepared) => {
                    assert_eq!(prepared.frame.dims(), FrameDims::new(16, 12));
                    assert!(last_captured.map_or(true, |last| last <= prepared.captured_at));
                    last_captured = Some(prepared.captured_at);
                    sequences.push(prepared.sequence);
                }
                Err(_) => break,
            }
        }
        assert_eq!(sequences, (1..=12).collect::<Vec<u64>>());
        let stats = capture.stop().unwrap();
        assert_eq!(stats.frames_captured, 12);
    }

    #[test]
    fn stop_unblocks_a_full_channel() {
        let pre = Preprocessor::new(FrameDims::new(32, 24), 2).unwrap();
        let capture = CaptureThread::spawn(connected_source(None), pre, 1, None);
        let first = capture.recv().unwrap().unwrap();
        assert_eq!(first.sequence, 1);
        let stats = capture.stop().unwrap();
        assert!(stats.frames_captured >= 1);
    }

    #[test]
    fn capture_errors_reach_the_driver() {
        let pre = Preprocessor::new(FrameDims::new(32, 24), 2).unwrap();
        let capture = CaptureThread::spawn(connected_source(Some(1)), pre, 4, None);
        let timeout = Duration::from_secs(5);
        assert!(capture.recv_timeout(timeout).unwrap().is_some());
        assert!(capture.recv_timeout(timeout).is_err());
        capture.stop().unwrap();
    }
}
