use thiserror::Error;

use crate::frame::FrameDims;

/// Errors raised by the motion kernel.
///
/// None of these are retried internally. A mismatch or an empty read means a
/// caller broke the preprocessing contract, so it is surfaced to the driver
/// instead of producing a silently wrong detection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MotionError {
    #[error("frame is {actual}, model expects {expected}")]
    DimensionMismatch {
        expected: FrameDims,
        actual: FrameDims,
    },

    #[error("background estimate read before any frame was observed")]
    EmptyModelRead,

    #[error("frame buffer holds {actual} samples, dimensions require {expected}")]
    SampleCount { expected: usize, actual: usize },

    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MotionError>;
