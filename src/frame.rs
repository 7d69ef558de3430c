//! Frame types.
//!
//! The preprocessing contract is enforced at the type level:
//!
//! - `CapturedFrame`: whatever a source delivered (RGB24 or Gray8, source dimensions).
//! - `GrayFrame`: a single-channel frame at working resolution. This is the only
//!   frame type the background model and the motion pipeline accept.
//!
//! A captured frame cannot be handed to the model directly:
//!
//! ```compile_fail
//! use motion_kernel::{BackgroundModel, CapturedFrame, FrameDims};
//!
//! let mut model = BackgroundModel::new(FrameDims::new(4, 4), 3).unwrap();
//! let captured = CapturedFrame::gray(vec![0; 16], 4, 4).unwrap();
//! model.observe(captured).unwrap();
//! ```
//!
//! and the samples of a `GrayFrame` cannot be mutated once built:
//!
//! ```compile_fail
//! use motion_kernel::GrayFrame;
//!
//! let mut frame = GrayFrame::from_samples(2, 2, vec![0; 4]).unwrap();
//! frame.data[0] = 255;
//! ```

use std::fmt;
use std::time::Instant;

use crate::error::MotionError;

/// Width and height of a frame, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameDims {
    pub width: u32,
    pub height: u32,
}

impl FrameDims {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of samples in a single-channel frame of these dimensions.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Dimensions after integer division by `scale`. A zero scale yields empty
    /// dimensions, which every constructor taking dims rejects.
    pub fn downscaled(&self, scale: u32) -> Self {
        Self {
            width: self.width.checked_div(scale).unwrap_or(0),
            height: self.height.checked_div(scale).unwrap_or(0),
        }
    }
}

impl fmt::Display for FrameDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ----------------------------------------------------------------------------
// CapturedFrame: what a source hands to the driver
// ----------------------------------------------------------------------------

/// Sample layout of a captured frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb24,
    Gray8,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Rgb24 => 3,
            PixelLayout::Gray8 => 1,
        }
    }
}

/// A frame as delivered by a capture source, before preprocessing.
///
/// The only conversion to `GrayFrame` is `Preprocessor::apply`.
pub struct CapturedFrame {
    data: Vec<u8>,
    layout: PixelLayout,
    pub width: u32,
    pub height: u32,
    /// Position of this frame in its source's capture order, starting at 1.
    pub sequence: u64,
    captured_at: Instant,
}

impl CapturedFrame {
    /// Wrap interleaved RGB24 samples.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self, MotionError> {
        Self::with_layout(data, width, height, PixelLayout::Rgb24)
    }

    /// Wrap single-channel 8-bit samples.
    pub fn gray(data: Vec<u8>, width: u32, height: u32) -> Result<Self, MotionError> {
        Self::with_layout(data, width, height, PixelLayout::Gray8)
    }

    fn with_layout(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, MotionError> {
        let dims = FrameDims::new(width, height);
        if dims.area() == 0 {
            return Err(MotionError::InvalidConfig(format!(
                "captured frame {dims} has no pixels"
            )));
        }
        let expected = dims.area() * layout.channels();
        if data.len() != expected {
            return Err(MotionError::SampleCount {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            layout,
            width,
            height,
            sequence: 0,
            captured_at: Instant::now(),
        })
    }

    /// Tag the frame with its capture sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn dims(&self) -> FrameDims {
        FrameDims::new(self.width, self.height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// When the source produced this frame.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub(crate) fn samples(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("layout", &self.layout)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// GrayFrame: preprocessed single-channel frame
// ----------------------------------------------------------------------------

/// Preprocessed single-channel frame at working resolution.
///
/// Samples are immutable once the frame is built. Frames are moved, not shared:
/// the background model takes ownership of every frame it observes.
#[derive(Clone, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    dims: FrameDims,
}

impl GrayFrame {
    /// Build a frame from samples the caller has already preprocessed.
    ///
    /// Callers using this instead of `Preprocessor::apply` take on the obligation
    /// to preprocess every frame of a stream identically.
    pub fn from_samples(width: u32, height: u32, data: Vec<u8>) -> Result<Self, MotionError> {
        let dims = FrameDims::new(width, height);
        if data.len() != dims.area() {
            return Err(MotionError::SampleCount {
                expected: dims.area(),
                actual: data.len(),
            });
        }
        Ok(Self { data, dims })
    }

    /// A frame with every sample set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        let dims = FrameDims::new(width, height);
        Self {
            data: vec![value; dims.area()],
            dims,
        }
    }

    pub(crate) fn from_parts(dims: FrameDims, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), dims.area());
        Self { data, dims }
    }

    pub fn width(&self) -> u32 {
        self.dims.width
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    /// Row-major samples.
    pub fn samples(&self) -> &[u8] {
        &self.data
    }

    /// Sample at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.dims.width as usize + x as usize]
    }
}

impl fmt::Debug for GrayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrayFrame")
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_frame_rejects_wrong_sample_count() {
        let err = GrayFrame::from_samples(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            MotionError::SampleCount {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn gray_frame_indexes_row_major() {
        let frame = GrayFrame::from_samples(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(frame.get(0, 0), 0);
        assert_eq!(frame.get(2, 0), 2);
        assert_eq!(frame.get(1, 1), 4);
    }

    #[test]
    fn captured_frame_validates_rgb_length() {
        assert!(CapturedFrame::rgb(vec![0; 12], 2, 2).is_ok());
        assert!(CapturedFrame::rgb(vec![0; 4], 2, 2).is_err());
    }

    #[test]
    fn captured_frame_rejects_empty_dimensions() {
        for (width, height) in [(0, 0), (0, 4), (4, 0)] {
            let err = CapturedFrame::rgb(Vec::new(), width, height).unwrap_err();
            assert!(matches!(err, MotionError::InvalidConfig(_)));
            assert!(CapturedFrame::gray(Vec::new(), width, height).is_err());
        }
    }

    #[test]
    fn dims_downscale_truncates() {
        assert_eq!(FrameDims::new(641, 479).downscaled(2), FrameDims::new(320, 239));
        assert_eq!(FrameDims::new(640, 480).to_string(), "640x480");
        assert_eq!(FrameDims::new(640, 480).downscaled(0).area(), 0);
    }
}
