//! Running-average background model.
//!
//! The model keeps the last `capacity` preprocessed frames in a bounded FIFO and
//! maintains their per-sample mean:
//!
//! - While the window is filling, the mean is recomputed from the window.
//! - Once the window is full, each new frame replaces the oldest one and the mean
//!   is updated in O(1) per sample: `mean - evicted / capacity + frame / capacity`.
//! - Every `resync_interval` incremental updates the mean is recomputed from the
//!   window, which bounds the floating-point drift of long runs.

use std::collections::VecDeque;

use crate::error::{MotionError, Result};
use crate::frame::{FrameDims, GrayFrame};

// ----------------------------------------------------------------------------
// SlidingWindow: bounded FIFO of recent frames
// ----------------------------------------------------------------------------

/// Bounded FIFO of the most recent frames, oldest first.
#[derive(Debug)]
pub struct SlidingWindow {
    frames: VecDeque<GrayFrame>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a frame, returning the evicted frame when the window was full.
    pub fn push(&mut self, frame: GrayFrame) -> Option<GrayFrame> {
        let evicted = if self.frames.len() >= self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed frame.
    pub fn latest(&self) -> Option<&GrayFrame> {
        self.frames.back()
    }

    /// Frames in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &GrayFrame> + '_ {
        self.frames.iter()
    }
}

// ----------------------------------------------------------------------------
// BackgroundEstimate
// ----------------------------------------------------------------------------

/// Frame-shaped `f32` mean of the sliding window.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundEstimate {
    samples: Vec<f32>,
    dims: FrameDims,
}

impl BackgroundEstimate {
    fn zeroed(dims: FrameDims) -> Self {
        Self {
            samples: vec![0.0; dims.area()],
            dims,
        }
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    /// Row-major mean samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.samples[y as usize * self.dims.width as usize + x as usize]
    }

    /// Convert to 8-bit samples, truncating the fractional part.
    ///
    /// Truncation (not rounding) matches casting down to the frame's native sample
    /// type, so a mean of 99.9 compares as 99.
    pub fn quantize(&self) -> GrayFrame {
        let data = self
            .samples
            .iter()
            .map(|&v| v.clamp(0.0, 255.0) as u8)
            .collect();
        GrayFrame::from_parts(self.dims, data)
    }

    /// Recompute from scratch as the arithmetic mean of `frames`.
    fn recompute<'a>(&mut self, frames: impl Iterator<Item = &'a GrayFrame>) {
        let mut sums = vec![0u64; self.samples.len()];
        let mut count = 0u64;
        for frame in frames {
            for (sum, &sample) in sums.iter_mut().zip(frame.samples()) {
                *sum += sample as u64;
            }
            count += 1;
        }
        if count == 0 {
            self.samples.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        let count = count as f64;
        for (mean, sum) in self.samples.iter_mut().zip(sums) {
            *mean = (sum as f64 / count) as f32;
        }
    }

    /// Swap one frame's contribution for another's.
    fn replace(&mut self, evicted: &GrayFrame, frame: &GrayFrame, capacity: usize) {
        let capacity = capacity as f32;
        for ((mean, &old), &new) in self
            .samples
            .iter_mut()
            .zip(evicted.samples())
            .zip(frame.samples())
        {
            *mean -= old as f32 / capacity;
            *mean += new as f32 / capacity;
        }
    }
}

// ----------------------------------------------------------------------------
// BackgroundModel
// ----------------------------------------------------------------------------

/// Running average of the last `capacity` frames.
///
/// Not safe for concurrent mutation: callers feed frames in capture order from a
/// single thread and never interleave two `observe` calls.
#[derive(Debug)]
pub struct BackgroundModel {
    dims: FrameDims,
    window: SlidingWindow,
    estimate: Option<BackgroundEstimate>,
    resync_interval: usize,
    updates_since_resync: usize,
}

impl BackgroundModel {
    /// Model for frames of `dims`, averaging the last `capacity` frames.
    ///
    /// The estimate is resynchronised from the window every `capacity`
    /// incremental updates; see [`BackgroundModel::with_resync_interval`].
    pub fn new(dims: FrameDims, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MotionError::InvalidConfig(
                "window capacity must be greater than zero".into(),
            ));
        }
        if dims.area() == 0 {
            return Err(MotionError::InvalidConfig(format!(
                "working dimensions {dims} are empty"
            )));
        }
        Ok(Self {
            dims,
            window: SlidingWindow::new(capacity),
            estimate: None,
            resync_interval: capacity,
            updates_since_resync: 0,
        })
    }

    /// Override how many incremental updates may run before the mean is
    /// recomputed from the window. Zero disables resynchronisation.
    pub fn with_resync_interval(mut self, interval: usize) -> Self {
        self.resync_interval = interval;
        self
    }

    /// Add a frame to the window and return the updated estimate.
    pub fn observe(&mut self, frame: GrayFrame) -> Result<&BackgroundEstimate> {
        if frame.dims() != self.dims {
            return Err(MotionError::DimensionMismatch {
                expected: self.dims,
                actual: frame.dims(),
            });
        }

        let dims = self.dims;
        let capacity = self.window.capacity();
        let estimate = self
            .estimate
            .get_or_insert_with(|| BackgroundEstimate::zeroed(dims));

        if !self.window.is_full() {
            self.window.push(frame);
            estimate.recompute(self.window.iter());
            self.updates_since_resync = 0;
            return Ok(&*estimate);
        }

        if let Some(evicted) = self.window.push(frame) {
            if let Some(latest) = self.window.latest() {
                estimate.replace(&evicted, latest, capacity);
            }
        }
        self.updates_since_resync += 1;

        if self.resync_interval > 0 && self.updates_since_resync >= self.resync_interval {
            estimate.recompute(self.window.iter());
            self.updates_since_resync = 0;
            log::trace!("background estimate resynchronised from {} frames", capacity);
        }

        Ok(&*estimate)
    }

    /// Current estimate. Fails before the first observation.
    pub fn estimate(&self) -> Result<&BackgroundEstimate> {
        self.estimate.as_ref().ok_or(MotionError::EmptyModelRead)
    }

    /// Most recently observed frame.
    pub fn latest(&self) -> Option<&GrayFrame> {
        self.window.latest()
    }

    /// Frames currently averaged, oldest first.
    pub fn window_frames(&self) -> impl Iterator<Item = &GrayFrame> + '_ {
        self.window.iter()
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
