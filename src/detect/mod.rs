//! Per-frame motion detection: difference, threshold, region extraction, area filter.

pub mod mask;
mod pipeline;
pub mod regions;
mod result;

pub use mask::{abs_difference, threshold, Mask};
pub use pipeline::{
    MotionPipeline, PipelineConfig, DEFAULT_DIFF_THRESHOLD, DEFAULT_MIN_AREA,
    DEFAULT_SCALE_FACTOR,
};
pub use regions::{Components, ConnectedComponents, Connectivity, RegionExtractor};
pub use result::{BoundingBox, Detection, MotionReport, Region};
