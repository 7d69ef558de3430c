//! Frame preprocessing.
//!
//! Every captured frame goes through the same stages before it reaches the
//! background model:
//!
//! 1. resize to the capture resolution (nearest neighbour, only when the source
//!    delivers a different size),
//! 2. optional horizontal mirror,
//! 3. downscale by the scale factor (area average),
//! 4. reduce to intensity (BT.601 luma),
//! 5. optional 5x5 Gaussian blur to suppress sensor noise.

use crate::error::{MotionError, Result};
use crate::frame::{CapturedFrame, FrameDims, GrayFrame};

/// Binomial approximation of a 5-tap Gaussian; weights sum to 16.
const GAUSS_5: [u32; 5] = [1, 4, 6, 4, 1];

/// Stateless frame preprocessor. Build once and apply to every frame of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preprocessor {
    capture: FrameDims,
    scale: u32,
    mirror: bool,
    blur: bool,
}

impl Preprocessor {
    /// Preprocessor for frames captured at `capture` resolution, analysed at that
    /// resolution divided by `scale`.
    pub fn new(capture: FrameDims, scale: u32) -> Result<Self> {
        if scale == 0 {
            return Err(MotionError::InvalidConfig(
                "scale factor must be at least 1".into(),
            ));
        }
        if capture.downscaled(scale).area() == 0 {
            return Err(MotionError::InvalidConfig(format!(
                "capture dimensions {capture} vanish at scale {scale}"
            )));
        }
        Ok(Self {
            capture,
            scale,
            mirror: true,
            blur: true,
        })
    }

    /// Mirror frames horizontally (on by default, as for a user-facing webcam).
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Apply the 5x5 Gaussian blur (on by default).
    pub fn with_blur(mut self, blur: bool) -> Self {
        self.blur = blur;
        self
    }

    /// Dimensions of the frames this preprocessor produces.
    pub fn output_dims(&self) -> FrameDims {
        self.capture.downscaled(self.scale)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn apply(&self, frame: &CapturedFrame) -> GrayFrame {
        let channels = frame.layout().channels();
        let mut image = Planar {
            data: frame.samples().to_vec(),
            dims: frame.dims(),
            channels,
        };

        if image.dims != self.capture {
            image = image.resize_nearest(self.capture);
        }
        if self.mirror {
            image.mirror();
        }
        if self.scale > 1 {
            image = image.downscale(self.scale);
        }
        let gray = image.into_gray();
        if self.blur {
            gaussian_blur_5(&gray)
        } else {
            gray
        }
    }
}

/// Interleaved 8-bit image with 1 or 3 channels.
struct Planar {
    data: Vec<u8>,
    dims: FrameDims,
    channels: usize,
}

impl Planar {
    fn resize_nearest(&self, target: FrameDims) -> Self {
        let (sw, sh) = (self.dims.width as usize, self.dims.height as usize);
        let (tw, th) = (target.width as usize, target.height as usize);
        let c = self.channels;
        let mut data = Vec::with_capacity(tw * th * c);
        for y in 0..th {
            let sy = y * sh / th;
            for x in 0..tw {
                let sx = x * sw / tw;
                let offset = (sy * sw + sx) * c;
                data.extend_from_slice(&self.data[offset..offset + c]);
            }
        }
        Self {
            data,
            dims: target,
            channels: c,
        }
    }

    fn mirror(&mut self) {
        let row_len = self.dims.width as usize * self.channels;
        let c = self.channels;
        for row in self.data.chunks_exact_mut(row_len) {
            let width = row_len / c;
            for x in 0..width / 2 {
                let (left, right) = (x * c, (width - 1 - x) * c);
                for k in 0..c {
                    row.swap(left + k, right + k);
                }
            }
        }
    }

    fn downscale(&self, scale: u32) -> Self {
        let target = self.dims.downscaled(scale);
        let s = scale as usize;
        let c = self.channels;
        let sw = self.dims.width as usize;
        let n = (s * s) as u32;
        let mut data = Vec::with_capacity(target.area() * c);
        for ty in 0..target.height as usize {
            for tx in 0..target.width as usize {
                for k in 0..c {
                    let mut sum = 0u32;
                    for dy in 0..s {
                        let row = (ty * s + dy) * sw;
                        for dx in 0..s {
                            sum += self.data[(row + tx * s + dx) * c + k] as u32;
                        }
                    }
                    data.push(((sum + n / 2) / n) as u8);
                }
            }
        }
        Self {
            data,
            dims: target,
            channels: c,
        }
    }

    fn into_gray(self) -> GrayFrame {
        if self.channels == 1 {
            return GrayFrame::from_parts(self.dims, self.data);
        }
        let data = self
            .data
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();
        GrayFrame::from_parts(self.dims, data)
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

/// Border index mirroring without repeating the edge sample (`dcb|abcd|cba`).
fn reflect_101(i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Separable 5x5 Gaussian blur with reflect-101 borders, rounded to nearest.
pub fn gaussian_blur_5(frame: &GrayFrame) -> GrayFrame {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let src = frame.samples();

    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, weight) in GAUSS_5.iter().enumerate() {
                let sx = reflect_101(x as i64 + k as i64 - 2, w as i64);
                acc += weight * src[y * w + sx] as u32;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, weight) in GAUSS_5.iter().enumerate() {
                let sy = reflect_101(y as i64 + k as i64 - 2, h as i64);
                acc += weight * horizontal[sy * w + x];
            }
            out[y * w + x] = ((acc + 128) >> 8) as u8;
        }
    }
    GrayFrame::from_parts(frame.dims(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> CapturedFrame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        CapturedFrame::rgb(data, width, height).unwrap()
    }

    fn plain(capture: FrameDims, scale: u32) -> Preprocessor {
        Preprocessor::new(capture, scale)
            .unwrap()
            .with_mirror(false)
            .with_blur(false)
    }

    #[test]
    fn luma_uses_bt601_weights() {
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
        assert_eq!(luma(255, 255, 255), 255);
    }

    #[test]
    fn constant_frame_survives_every_stage() {
        let frame = rgb_frame(8, 6, |_, _| [100, 100, 100]);
        let pre = Preprocessor::new(FrameDims::new(8, 6), 2).unwrap();
        let gray = pre.apply(&frame);
        assert_eq!(gray, GrayFrame::filled(4, 3, 100));
    }

    #[test]
    fn downscale_averages_blocks() {
        let data = vec![
            0, 100, 10, 10, //
            200, 100, 10, 10,
        ];
        let frame = CapturedFrame::gray(data, 4, 2).unwrap();
        let gray = plain(FrameDims::new(4, 2), 2).apply(&frame);
        assert_eq!(gray.samples(), &[100, 10]);
    }

    #[test]
    fn mirror_flips_columns() {
        let frame = CapturedFrame::gray(vec![1, 2, 3, 4, 5, 6], 3, 2).unwrap();
        let gray = plain(FrameDims::new(3, 2), 1).with_mirror(true).apply(&frame);
        assert_eq!(gray.samples(), &[3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn mismatched_source_is_resized_to_capture_dims() {
        let frame = rgb_frame(8, 8, |x, y| {
            let v = (x / 2 + 4 * (y / 2)) as u8 * 10;
            [v, v, v]
        });
        let gray = plain(FrameDims::new(4, 4), 1).apply(&frame);
        assert_eq!(gray.dims(), FrameDims::new(4, 4));
        assert_eq!(gray.get(1, 0), 10);
        assert_eq!(gray.get(3, 3), 150);
    }

    #[test]
    fn blur_spreads_an_impulse() {
        let mut data = vec![0u8; 49];
        data[24] = 255;
        let frame = GrayFrame::from_samples(7, 7, data).unwrap();
        let blurred = gaussian_blur_5(&frame);
        assert_eq!(blurred.get(3, 3), 36);
        assert_eq!(blurred.get(0, 0), 0);
        assert!(blurred.get(2, 3) > 0);
        assert_eq!(blurred.get(2, 3), blurred.get(4, 3));
    }

    #[test]
    fn reflect_stays_in_bounds() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(-2, 2), 0);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn invalid_scale_is_rejected() {
        assert!(Preprocessor::new(FrameDims::new(4, 4), 0).is_err());
        assert!(Preprocessor::new(FrameDims::new(4, 4), 5).is_err());
    }
}
