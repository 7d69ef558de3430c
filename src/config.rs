use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::background::BackgroundModel;
use crate::detect::{
    ConnectedComponents, Connectivity, MotionPipeline, PipelineConfig, DEFAULT_DIFF_THRESHOLD,
    DEFAULT_MIN_AREA, DEFAULT_SCALE_FACTOR,
};
use crate::frame::FrameDims;
use crate::ingest::SourceConfig;
use crate::preprocess::Preprocessor;

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_WINDOW: usize = 30;
const DEFAULT_QUEUE_DEPTH: usize = 2;
const DEFAULT_HEALTH_LOG_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    source: Option<SourceConfigFile>,
    model: Option<ModelConfigFile>,
    detection: Option<DetectionConfigFile>,
    capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    max_frames: Option<u64>,
    mirror: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    scale: Option<u32>,
    window: Option<usize>,
    resync_interval: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    diff_threshold: Option<u8>,
    min_area: Option<u32>,
    blur: Option<bool>,
    connectivity: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    queue_depth: Option<usize>,
    health_log_secs: Option<u64>,
}

/// Runtime configuration for `motiond`.
///
/// Layered as defaults, then the file named by `MOTION_CONFIG` (JSON, or TOML
/// for a `.toml` extension), then `MOTION_*` environment overrides.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    pub source: SourceConfig,
    pub mirror: bool,
    pub blur: bool,
    pub model: ModelSettings,
    pub detection: PipelineConfig,
    pub connectivity: Connectivity,
    pub queue_depth: usize,
    pub health_log_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Frames averaged into the background.
    pub window: usize,
    /// Incremental updates between full recomputations; 0 disables.
    pub resync_interval: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                url: DEFAULT_SOURCE_URL.to_string(),
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                target_fps: DEFAULT_FPS,
                max_frames: None,
            },
            mirror: true,
            blur: true,
            model: ModelSettings {
                window: DEFAULT_WINDOW,
                resync_interval: DEFAULT_WINDOW,
            },
            detection: PipelineConfig::default(),
            connectivity: Connectivity::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            health_log_interval: Duration::from_secs(DEFAULT_HEALTH_LOG_SECS),
        }
    }
}

impl MotionConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MotionConfigFile) -> Result<Self> {
        let source_file = file.source.unwrap_or_default();
        let model_file = file.model.unwrap_or_default();
        let detection_file = file.detection.unwrap_or_default();
        let capture_file = file.capture.unwrap_or_default();

        let source = SourceConfig {
            url: source_file
                .url
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_FPS),
            width: source_file.width.unwrap_or(DEFAULT_WIDTH),
            height: source_file.height.unwrap_or(DEFAULT_HEIGHT),
            max_frames: source_file.max_frames,
        };
        let window = model_file.window.unwrap_or(DEFAULT_WINDOW);
        let model = ModelSettings {
            window,
            resync_interval: model_file.resync_interval.unwrap_or(window),
        };
        let detection = PipelineConfig {
            scale_factor: model_file.scale.unwrap_or(DEFAULT_SCALE_FACTOR),
            diff_threshold: detection_file
                .diff_threshold
                .unwrap_or(DEFAULT_DIFF_THRESHOLD),
            min_area: detection_file.min_area.unwrap_or(DEFAULT_MIN_AREA),
        };
        let connectivity = match detection_file.connectivity {
            None => Connectivity::default(),
            Some(value) => parse_connectivity(value)?,
        };

        Ok(Self {
            source,
            mirror: source_file.mirror.unwrap_or(true),
            blur: detection_file.blur.unwrap_or(true),
            model,
            detection,
            connectivity,
            queue_depth: capture_file.queue_depth.unwrap_or(DEFAULT_QUEUE_DEPTH),
            health_log_interval: Duration::from_secs(
                capture_file
                    .health_log_secs
                    .unwrap_or(DEFAULT_HEALTH_LOG_SECS),
            ),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("MOTION_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Some(width) = env_parse("MOTION_WIDTH")? {
            self.source.width = width;
        }
        if let Some(height) = env_parse("MOTION_HEIGHT")? {
            self.source.height = height;
        }
        if let Some(fps) = env_parse("MOTION_FPS")? {
            self.source.target_fps = fps;
        }
        if let Some(mirror) = env_parse("MOTION_MIRROR")? {
            self.mirror = mirror;
        }
        if let Some(scale) = env_parse("MOTION_SCALE")? {
            self.detection.scale_factor = scale;
        }
        if let Some(window) = env_parse::<usize>("MOTION_WINDOW")? {
            // keep the resync cadence tied to the window unless set explicitly
            if self.model.resync_interval == self.model.window {
                self.model.resync_interval = window;
            }
            self.model.window = window;
        }
        if let Some(threshold) = env_parse("MOTION_DIFF_THRESHOLD")? {
            self.detection.diff_threshold = threshold;
        }
        if let Some(min_area) = env_parse("MOTION_MIN_AREA")? {
            self.detection.min_area = min_area;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("target_fps must be >= 1"));
        }
        if self.detection.scale_factor == 0 {
            return Err(anyhow!("scale must be >= 1"));
        }
        if self.working_dims().area() == 0 {
            return Err(anyhow!(
                "source {} vanishes at scale {}",
                self.source.dims(),
                self.detection.scale_factor
            ));
        }
        if self.model.window == 0 {
            return Err(anyhow!("window must be greater than zero"));
        }
        if self.queue_depth == 0 {
            return Err(anyhow!("capture queue_depth must be greater than zero"));
        }
        if self.source.width % self.detection.scale_factor != 0
            || self.source.height % self.detection.scale_factor != 0
        {
            log::warn!(
                "source {} is not a multiple of scale {}; edge pixels are dropped",
                self.source.dims(),
                self.detection.scale_factor
            );
        }
        if self.detection.min_area as usize > self.working_dims().area() {
            log::warn!(
                "min_area {} exceeds the working frame area {}; nothing can be detected",
                self.detection.min_area,
                self.working_dims().area()
            );
        }
        Ok(())
    }

    /// Resolution the background model runs at.
    pub fn working_dims(&self) -> FrameDims {
        self.source.dims().downscaled(self.detection.scale_factor)
    }

    /// Time between captured frames at the target rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.source.target_fps.max(1)
    }

    pub fn preprocessor(&self) -> Result<Preprocessor> {
        Ok(
            Preprocessor::new(self.source.dims(), self.detection.scale_factor)?
                .with_mirror(self.mirror)
                .with_blur(self.blur),
        )
    }

    pub fn pipeline(&self) -> Result<MotionPipeline> {
        let model = BackgroundModel::new(self.working_dims(), self.model.window)?
            .with_resync_interval(self.model.resync_interval);
        Ok(MotionPipeline::with_model(model, self.detection)?
            .with_extractor(ConnectedComponents::new(self.connectivity)))
    }
}

fn parse_connectivity(value: u8) -> Result<Connectivity> {
    match value {
        4 => Ok(Connectivity::Four),
        8 => Ok(Connectivity::Eight),
        other => Err(anyhow!("connectivity must be 4 or 8, got {}", other)),
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<MotionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_driver() {
        let cfg = MotionConfig::default();
        assert_eq!(cfg.source.url, "stub://camera");
        assert_eq!(cfg.source.dims(), FrameDims::new(640, 480));
        assert_eq!(cfg.working_dims(), FrameDims::new(320, 240));
        assert_eq!(cfg.model.window, 30);
        assert_eq!(cfg.model.resync_interval, 30);
        assert_eq!(cfg.detection, PipelineConfig::default());
        assert_eq!(cfg.connectivity, Connectivity::Eight);
        assert_eq!(cfg.frame_interval(), Duration::from_millis(100));
    }

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let from_file = MotionConfig::from_file(MotionConfigFile::default())?;
        let defaults = MotionConfig::default();
        assert_eq!(from_file.source, defaults.source);
        assert_eq!(from_file.model, defaults.model);
        assert_eq!(from_file.detection, defaults.detection);
        assert_eq!(from_file.queue_depth, defaults.queue_depth);
        Ok(())
    }

    #[test]
    fn bad_connectivity_is_rejected() {
        let file = MotionConfigFile {
            detection: Some(DetectionConfigFile {
                connectivity: Some(6),
                ..DetectionConfigFile::default()
            }),
            ..MotionConfigFile::default()
        };
        assert!(MotionConfig::from_file(file).is_err());
    }

    #[test]
    fn validate_rejects_degenerate_settings() {
        let mut cfg = MotionConfig::default();
        cfg.model.window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = MotionConfig::default();
        cfg.detection.scale_factor = 1000;
        assert!(cfg.validate().is_err());

        let mut cfg = MotionConfig::default();
        cfg.source.target_fps = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pipeline_uses_working_dims() -> Result<()> {
        let cfg = MotionConfig::default();
        let pipeline = cfg.pipeline()?;
        assert_eq!(pipeline.model().dims(), FrameDims::new(320, 240));
        assert_eq!(pipeline.model().capacity(), 30);
        assert_eq!(cfg.preprocessor()?.output_dims(), FrameDims::new(320, 240));
        Ok(())
    }

    #[test]
    fn zero_scale_fails_instead_of_panicking() {
        let mut cfg = MotionConfig::default();
        cfg.detection.scale_factor = 0;
        assert_eq!(cfg.working_dims().area(), 0);
        assert!(cfg.validate().is_err());
        assert!(cfg.pipeline().is_err());
        assert!(cfg.preprocessor().is_err());
    }
}
