use crate::error::{MotionError, Result};
use crate::frame::{FrameDims, GrayFrame};

/// Binary image marking pixels that differ from the background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    bits: Vec<bool>,
    dims: FrameDims,
}

impl Mask {
    /// Build a mask from row-major bits.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Result<Self> {
        let dims = FrameDims::new(width, height);
        if bits.len() != dims.area() {
            return Err(MotionError::SampleCount {
                expected: dims.area(),
                actual: bits.len(),
            });
        }
        Ok(Self { bits, dims })
    }

    /// An all-off mask.
    pub fn empty(width: u32, height: u32) -> Self {
        let dims = FrameDims::new(width, height);
        Self {
            bits: vec![false; dims.area()],
            dims,
        }
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    pub fn width(&self) -> u32 {
        self.dims.width
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        let idx = self.index(x, y);
        self.bits[idx] = on;
    }

    /// Number of "on" pixels.
    pub fn count_on(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub(crate) fn bits(&self) -> &[bool] {
        &self.bits
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.dims.width as usize + x as usize
    }
}

/// Per-pixel `|a - b|`.
pub fn abs_difference(a: &GrayFrame, b: &GrayFrame) -> Result<GrayFrame> {
    if a.dims() != b.dims() {
        return Err(MotionError::DimensionMismatch {
            expected: a.dims(),
            actual: b.dims(),
        });
    }
    let data = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(&x, &y)| x.abs_diff(y))
        .collect();
    Ok(GrayFrame::from_parts(a.dims(), data))
}

/// Mark pixels whose difference is strictly greater than `threshold`.
pub fn threshold(diff: &GrayFrame, threshold: u8) -> Mask {
    Mask {
        bits: diff.samples().iter().map(|&d| d > threshold).collect(),
        dims: diff.dims(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> GrayFrame {
        GrayFrame::from_samples(16, 16, (0..=255).collect()).unwrap()
    }

    #[test]
    fn difference_is_symmetric_and_absolute() {
        let a = GrayFrame::from_samples(3, 1, vec![10, 200, 50]).unwrap();
        let b = GrayFrame::from_samples(3, 1, vec![30, 100, 50]).unwrap();
        let ab = abs_difference(&a, &b).unwrap();
        assert_eq!(ab.samples(), &[20, 100, 0]);
        assert_eq!(ab, abs_difference(&b, &a).unwrap());
    }

    #[test]
    fn difference_rejects_mismatched_frames() {
        let a = GrayFrame::filled(3, 2, 0);
        let b = GrayFrame::filled(2, 3, 0);
        assert!(matches!(
            abs_difference(&a, &b),
            Err(MotionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let diff = GrayFrame::from_samples(3, 1, vec![14, 15, 16]).unwrap();
        let mask = threshold(&diff, 15);
        assert!(!mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(mask.get(2, 0));
    }

    #[test]
    fn raising_threshold_never_adds_pixels() {
        let diff = ramp();
        let mut previous = usize::MAX;
        for t in 0..=255u8 {
            let on = threshold(&diff, t).count_on();
            assert!(on <= previous);
            assert_eq!(on, 255 - t as usize);
            previous = on;
        }
    }

    #[test]
    fn mask_from_bits_validates_length() {
        assert!(Mask::from_bits(2, 2, vec![true; 3]).is_err());
        let mut mask = Mask::from_bits(2, 2, vec![false; 4]).unwrap();
        mask.set(1, 1, true);
        assert_eq!(mask.count_on(), 1);
        assert!(mask.get(1, 1));
    }
}
