//! Frame ingestion.
//!
//! This module provides the capture side of the driver loop:
//! - `CaptureSource`: synthetic `stub://` scenes and, with the `ingest-images`
//!   feature, local still-image sequences
//! - `CaptureThread`: runs capture and preprocessing ahead of the model on a worker
//!
//! Sources produce `CapturedFrame`s. They never touch the background model; frames
//! only reach it after preprocessing.

pub mod capture;
#[cfg(feature = "ingest-images")]
mod images;
pub mod source;
pub mod synthetic;

pub use capture::{CaptureThread, PreparedFrame};
pub use source::{CaptureSource, SourceConfig, SourceStats};
pub use synthetic::SyntheticScene;
