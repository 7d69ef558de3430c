use serde::Serialize;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: u32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// A connected group of changed pixels, in working (downscaled) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub bbox: BoundingBox,
    /// Number of mask pixels in the region.
    pub area: u32,
}

/// Motion rectangle in source-frame coordinates.
///
/// Only regions that passed the minimum-area filter become detections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<BoundingBox> for Detection {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
        }
    }
}

/// Outcome of running one frame through the pipeline.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MotionReport {
    /// Surviving detections, in extraction order.
    pub detections: Vec<Detection>,
    /// Mask pixels above the difference threshold.
    pub changed_pixels: usize,
    /// Regions dropped by the minimum-area filter.
    pub rejected_regions: usize,
    /// Frames in the background window after this frame was observed.
    pub window_len: usize,
}

impl MotionReport {
    pub fn motion_detected(&self) -> bool {
        !self.detections.is_empty()
    }
}
