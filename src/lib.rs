//! Motion Kernel
//!
//! Frame-differencing motion detection against a running-average background.
//!
//! # Architecture
//!
//! Every frame takes the same path:
//!
//! 1. **Capture**: a `CaptureSource` yields `CapturedFrame`s at source resolution.
//! 2. **Preprocess**: the `Preprocessor` mirrors, downscales, converts to luma and
//!    blurs, producing a `GrayFrame` at working resolution.
//! 3. **Model**: the `BackgroundModel` folds the frame into a sliding-window mean.
//! 4. **Detect**: the `MotionPipeline` differences the frame against the quantized
//!    background, thresholds, extracts connected regions and drops small ones.
//!
//! Only `GrayFrame`s reach the model. A `CapturedFrame` has to pass through the
//! preprocessor first, and the type system enforces it.
//!
//! # Module Structure
//!
//! - `frame`: captured and preprocessed frame types
//! - `preprocess`: capture-to-working conversion
//! - `background`: sliding window and running-average estimate
//! - `detect`: difference mask, region extraction, area filter
//! - `ingest`: frame sources and the capture thread
//! - `config`: `motiond` configuration

pub mod background;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod preprocess;

pub use background::{BackgroundEstimate, BackgroundModel, SlidingWindow};
pub use config::MotionConfig;
pub use detect::{
    BoundingBox, ConnectedComponents, Connectivity, Detection, Mask, MotionPipeline,
    MotionReport, PipelineConfig, Region, RegionExtractor,
};
pub use error::MotionError;
pub use frame::{CapturedFrame, FrameDims, GrayFrame, PixelLayout};
pub use ingest::{
    CaptureSource, CaptureThread, PreparedFrame, SourceConfig, SourceStats, SyntheticScene,
};
pub use preprocess::Preprocessor;
