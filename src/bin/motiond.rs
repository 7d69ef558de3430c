//! motiond - motion detection daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured source (`stub://` or an image directory)
//! 2. Preprocesses them on a capture thread (mirror, downscale, luma, blur)
//! 3. Folds each frame into the running-average background
//! 4. Logs motion regions, scaled back to source coordinates
//!
//! Configuration comes from `MOTION_CONFIG` and `MOTION_*` overrides.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use motion_kernel::{CaptureSource, CaptureThread, MotionConfig, MotionError};

const RECV_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = MotionConfig::load()?;

    let mut source = CaptureSource::new(cfg.source.clone())?;
    source.connect()?;
    let preprocessor = cfg.preprocessor()?;
    let mut pipeline = cfg.pipeline()?;

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "motiond running. source={} {} -> working {}",
        cfg.source.url,
        cfg.source.dims(),
        cfg.working_dims()
    );
    log::info!(
        "window={} resync={} threshold={} min_area={} extractor={}",
        cfg.model.window,
        cfg.model.resync_interval,
        cfg.detection.diff_threshold,
        cfg.detection.min_area,
        pipeline.extractor_name()
    );

    let capture = CaptureThread::spawn(
        source,
        preprocessor,
        cfg.queue_depth,
        Some(cfg.frame_interval()),
    );

    let mut last_health_log = Instant::now();
    let mut frames_processed = 0u64;
    let mut motion_frames = 0u64;
    let mut detection_count = 0u64;
    let mut max_latency = Duration::ZERO;
    let mut outcome = Ok(());

    while running.load(Ordering::SeqCst) {
        let prepared = match capture.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => continue,
            Err(e) => {
                outcome = capture_outcome(e);
                break;
            }
        };

        let report = match pipeline.analyze(prepared.frame) {
            Ok(report) => report,
            Err(e) => {
                outcome = Err(e.into());
                break;
            }
        };
        frames_processed += 1;
        let latency = prepared.captured_at.elapsed();
        max_latency = max_latency.max(latency);

        if report.motion_detected() {
            motion_frames += 1;
            for det in &report.detections {
                detection_count += 1;
                log::info!(
                    "motion #{}: frame={} x={} y={} w={} h={}",
                    detection_count,
                    prepared.sequence,
                    det.x,
                    det.y,
                    det.width,
                    det.height
                );
            }
        }
        log::debug!(
            "frame={} changed_pixels={} rejected_regions={} window={} latency_ms={}",
            prepared.sequence,
            report.changed_pixels,
            report.rejected_regions,
            report.window_len,
            latency.as_millis()
        );

        if last_health_log.elapsed() >= cfg.health_log_interval {
            log::info!(
                "health frames={} motion_frames={} detections={} window={}/{} max_latency_ms={}",
                frames_processed,
                motion_frames,
                detection_count,
                pipeline.model().len(),
                pipeline.model().capacity(),
                max_latency.as_millis()
            );
            last_health_log = Instant::now();
            max_latency = Duration::ZERO;
        }
    }

    if !running.load(Ordering::SeqCst) {
        log::info!("shutdown signal received, stopping capture...");
    }
    let stats = capture.stop()?;
    log::info!(
        "motiond stopped. captured={} processed={} motion_frames={} detections={} url={}",
        stats.frames_captured,
        frames_processed,
        motion_frames,
        detection_count,
        stats.url
    );
    outcome
}

/// A source that ran dry ends the run cleanly. Anything else is fatal.
fn capture_outcome(err: anyhow::Error) -> Result<()> {
    match err.downcast_ref::<MotionError>() {
        Some(MotionError::CaptureUnavailable(reason)) => {
            log::info!("capture ended: {}", reason);
            Ok(())
        }
        _ => {
            log::error!("capture failed: {}", err);
            Err(err)
        }
    }
}
