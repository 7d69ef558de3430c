//! Still-image sequence source.
//!
//! Reads every `.jpg`, `.jpeg` and `.png` file of a local directory in file-name
//! order and decodes it in memory. The source runs dry after the last file.

#![cfg(feature = "ingest-images")]

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use image::GenericImageView;

use super::source::{SourceConfig, SourceStats};
use crate::error::MotionError;
use crate::frame::CapturedFrame;

const EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub(crate) struct ImageSequenceSource {
    config: SourceConfig,
    files: Vec<PathBuf>,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageSequenceSource {
    pub(crate) fn new(config: SourceConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            frame_count: 0,
            last_error: None,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        let dir = PathBuf::from(&self.config.url);
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to list frame directory {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if matches {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no image frames found in {}", dir.display()));
        }
        files.sort();
        log::info!(
            "CaptureSource: {} frames queued from {}",
            files.len(),
            dir.display()
        );
        self.files = files;
        self.frame_count = 0;
        self.last_error = None;
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<CapturedFrame> {
        let limit = self
            .config
            .max_frames
            .map_or(self.files.len() as u64, |max| max.min(self.files.len() as u64));
        if self.frame_count >= limit {
            return Err(MotionError::CaptureUnavailable(format!(
                "{} exhausted after {} frames",
                self.config.url, self.frame_count
            ))
            .into());
        }
        let path = &self.files[self.frame_count as usize];
        let decoded = image::open(path).with_context(|| format!("decode {}", path.display()));
        let image = match decoded {
            Ok(image) => image,
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(err);
            }
        };
        let (width, height) = image.dimensions();
        let rgb = image.into_rgb8().into_raw();

        self.frame_count += 1;
        let frame = CapturedFrame::rgb(rgb, width, height)?;
        Ok(frame.with_sequence(self.frame_count))
    }

    pub(crate) fn is_healthy(&self) -> bool {
        !self.files.is_empty() && self.last_error.is_none()
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}
