use crate::background::BackgroundModel;
use crate::error::{MotionError, Result};
use crate::frame::{FrameDims, GrayFrame};

use super::mask::{abs_difference, threshold, Mask};
use super::regions::{ConnectedComponents, RegionExtractor};
use super::result::{Detection, MotionReport};

pub const DEFAULT_SCALE_FACTOR: u32 = 2;
pub const DEFAULT_DIFF_THRESHOLD: u8 = 15;
pub const DEFAULT_MIN_AREA: u32 = 250;

/// Construction-time detection parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Divisor applied to source resolution before analysis. Detections are
    /// multiplied back up by this factor.
    pub scale_factor: u32,
    /// A pixel is "changed" iff its difference from the background exceeds this.
    pub diff_threshold: u8,
    /// Smallest region, in working pixels, reported as motion.
    pub min_area: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

/// Turns preprocessed frames into motion detections.
///
/// One long-lived instance per stream. Frames must be fed in capture order and
/// one at a time; `process` fully updates the background before returning.
pub struct MotionPipeline {
    model: BackgroundModel,
    config: PipelineConfig,
    extractor: Box<dyn RegionExtractor>,
}

impl MotionPipeline {
    /// Pipeline over frames of `working` dimensions (already downscaled), with a
    /// background window of `capacity` frames.
    pub fn new(working: FrameDims, capacity: usize, config: PipelineConfig) -> Result<Self> {
        let model = BackgroundModel::new(working, capacity)?;
        Self::with_model(model, config)
    }

    /// Pipeline around an existing model, e.g. one with a custom resync interval.
    pub fn with_model(model: BackgroundModel, config: PipelineConfig) -> Result<Self> {
        if config.scale_factor == 0 {
            return Err(MotionError::InvalidConfig(
                "scale factor must be at least 1".into(),
            ));
        }
        Ok(Self {
            model,
            config,
            extractor: Box::new(ConnectedComponents::default()),
        })
    }

    /// Replace the default 8-connected region extractor.
    pub fn with_extractor<E: RegionExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Detections for one frame, in source-frame coordinates.
    pub fn process(&mut self, frame: GrayFrame) -> Result<Vec<Detection>> {
        self.analyze(frame).map(|report| report.detections)
    }

    /// Like `process`, with changed-pixel and filter statistics.
    pub fn analyze(&mut self, frame: GrayFrame) -> Result<MotionReport> {
        let mask = self.motion_mask(frame)?;

        let mut report = MotionReport {
            changed_pixels: mask.count_on(),
            window_len: self.model.len(),
            ..MotionReport::default()
        };
        for region in self.extractor.regions(&mask) {
            if region.area < self.config.min_area {
                report.rejected_regions += 1;
                continue;
            }
            report
                .detections
                .push(Detection::from(region.bbox.scaled(self.config.scale_factor)));
        }

        log::trace!(
            "{} changed pixels, {} detections, {} regions below min area",
            report.changed_pixels,
            report.detections.len(),
            report.rejected_regions
        );
        Ok(report)
    }

    /// Observe `frame` and threshold its difference against the updated background.
    pub fn motion_mask(&mut self, frame: GrayFrame) -> Result<Mask> {
        let background = self.model.observe(frame)?.quantize();
        let latest = self.model.latest().ok_or(MotionError::EmptyModelRead)?;
        let diff = abs_difference(&background, latest)?;
        Ok(threshold(&diff, self.config.diff_threshold))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model(&self) -> &BackgroundModel {
        &self.model
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }
}
