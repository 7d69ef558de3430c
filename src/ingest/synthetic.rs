//! Synthetic frame source (`stub://`).
//!
//! Renders a uniform background with bounded sensor noise. Once per cycle a
//! bright square crosses the scene from left to right, which gives the motion
//! pipeline a known event to find. The noise generator is seeded, so a scene
//! replays identically.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::source::{SourceConfig, SourceStats};
use crate::error::MotionError;
use crate::frame::CapturedFrame;

/// Parameters of the synthetic scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticScene {
    /// Background intensity.
    pub background: u8,
    /// Noise amplitude; each sample is perturbed by up to +/- this value.
    pub noise: u8,
    /// Side of the moving square, in source pixels.
    pub block_size: u32,
    /// Intensity of the moving square.
    pub block_value: u8,
    /// Frames per cycle with an empty scene.
    pub quiet_frames: u64,
    /// Frames per cycle during which the square crosses.
    pub moving_frames: u64,
    pub seed: u64,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self {
            background: 100,
            noise: 2,
            block_size: 100,
            block_value: 250,
            quiet_frames: 40,
            moving_frames: 20,
            seed: 0x5eed,
        }
    }
}

impl SyntheticScene {
    /// Top-left corner of the square for frame `sequence` (1-based), if visible.
    pub fn block_origin(&self, sequence: u64, width: u32, height: u32) -> Option<(u32, u32)> {
        let cycle = self.quiet_frames + self.moving_frames;
        if self.moving_frames == 0 || cycle == 0 || self.block_size > width.min(height) {
            return None;
        }
        let phase = (sequence.saturating_sub(1)) % cycle;
        if phase < self.quiet_frames {
            return None;
        }
        let step = phase - self.quiet_frames;
        let travel = (width - self.block_size) as u64;
        let x = if self.moving_frames > 1 {
            step * travel / (self.moving_frames - 1)
        } else {
            0
        };
        let y = (height - self.block_size) / 2;
        Some((x as u32, y))
    }
}

pub(crate) struct SyntheticSource {
    config: SourceConfig,
    scene: SyntheticScene,
    rng: StdRng,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub(crate) fn new(config: SourceConfig, scene: SyntheticScene) -> Self {
        let rng = StdRng::seed_from_u64(scene.seed);
        Self {
            config,
            scene,
            rng,
            frame_count: 0,
            connected: false,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("CaptureSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<CapturedFrame> {
        if !self.connected {
            return Err(MotionError::CaptureUnavailable(format!(
                "{} is not connected",
                self.config.url
            ))
            .into());
        }
        if let Some(limit) = self.config.max_frames {
            if self.frame_count >= limit {
                return Err(MotionError::CaptureUnavailable(format!(
                    "{} exhausted after {} frames",
                    self.config.url, limit
                ))
                .into());
            }
        }
        self.frame_count += 1;

        let pixels = self.render();
        let frame = CapturedFrame::rgb(pixels, self.config.width, self.config.height)?;
        Ok(frame.with_sequence(self.frame_count))
    }

    fn render(&mut self) -> Vec<u8> {
        let dims = self.config.dims();
        let width = dims.width as usize;
        let mut gray = vec![self.scene.background; dims.area()];

        if let Some((bx, by)) = self.scene.block_origin(self.frame_count, dims.width, dims.height)
        {
            let side = self.scene.block_size as usize;
            for y in by as usize..by as usize + side {
                let start = y * width + bx as usize;
                gray[start..start + side].fill(self.scene.block_value);
            }
        }

        if self.scene.noise > 0 {
            let amplitude = self.scene.noise as i16;
            for sample in gray.iter_mut() {
                let delta = self.rng.gen_range(-amplitude..=amplitude);
                *sample = (*sample as i16 + delta).clamp(0, 255) as u8;
            }
        }

        gray.iter().flat_map(|&v| [v, v, v]).collect()
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.connected
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}
