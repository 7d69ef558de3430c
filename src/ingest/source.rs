//! Capture source front end.
//!
//! `CaptureSource` dispatches on the configured URL:
//! - `stub://<name>`: synthetic scene (always available)
//! - a local directory path: still-image sequence (feature: ingest-images)
//!
//! Anything else is rejected at construction. Device and network capture are not
//! part of this crate.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-images")]
use super::images::ImageSequenceSource;
use super::synthetic::{SyntheticScene, SyntheticSource};
use crate::frame::{CapturedFrame, FrameDims};

/// Configuration for a capture source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceConfig {
    /// `stub://name` or a local directory of still frames.
    pub url: String,
    /// Frame width delivered by synthetic sources.
    pub width: u32,
    /// Frame height delivered by synthetic sources.
    pub height: u32,
    /// Target frame rate (frames per second). Drivers pace capture to this rate.
    pub target_fps: u32,
    /// Stop after this many frames. `None` runs until the source runs dry.
    pub max_frames: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 640,
            height: 480,
            target_fps: 10,
            max_frames: None,
        }
    }
}

impl SourceConfig {
    pub fn dims(&self) -> FrameDims {
        FrameDims::new(self.width, self.height)
    }
}

/// Statistics for a capture source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Frame source selected by URL.
pub struct CaptureSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-images")]
    Images(ImageSequenceSource),
}

impl CaptureSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        Self::with_scene(config, SyntheticScene::default())
    }

    /// Like `new`, with explicit parameters for a `stub://` scene.
    pub fn with_scene(config: SourceConfig, scene: SyntheticScene) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(anyhow!("source url must not be empty"));
        }
        if config.url.starts_with("stub://") {
            return Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticSource::new(config, scene)),
            });
        }
        if config.url.contains("://") {
            return Err(anyhow!(
                "unsupported source '{}': only stub:// and local paths are accepted",
                config.url
            ));
        }
        #[cfg(feature = "ingest-images")]
        {
            Ok(Self {
                backend: SourceBackend::Images(ImageSequenceSource::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-images"))]
        {
            Err(anyhow!(
                "image sequence ingestion requires the ingest-images feature"
            ))
        }
    }

    /// Connect to the source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-images")]
            SourceBackend::Images(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    ///
    /// Fails with `MotionError::CaptureUnavailable` when the source is not
    /// connected or has run dry. Retrying is the driver's decision.
    pub fn next_frame(&mut self) -> Result<CapturedFrame> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-images")]
            SourceBackend::Images(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-images")]
            SourceBackend::Images(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-images")]
            SourceBackend::Images(source) => source.stats(),
        }
    }
}
