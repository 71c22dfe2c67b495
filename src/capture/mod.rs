//! Per-item screenshot capture and export
//!
//! The pipeline walks a group one item at a time: position, measure, capture
//! the viewport, crop, record, throttle. Screenshots come from a
//! [`CaptureResource`], a single-flight and rate-limited host primitive, so the
//! pipeline takes exclusive (`&mut`) ownership of it for the whole run.

pub mod archive;
pub mod config;
pub mod crop;
pub mod export;
pub mod pipeline;
pub mod retry;

pub use archive::{ArchiveSink, DirectorySink, ExportArchive, MemorySink, ZipSink};
pub use config::CaptureConfig;
pub use crop::CropRect;
pub use export::{ExportRecord, ExportRow, ImageCell};
pub use pipeline::{CapturePipeline, ExportProgress, ExportReport, ExportStatus};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use thiserror::Error;

/// Classified failure of a viewport capture
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureFailure {
    /// The host's call-rate quota was exceeded
    #[error("capture rate limit exceeded: {0}")]
    RateLimited(String),

    /// Busy or otherwise temporarily unavailable
    #[error("capture temporarily unavailable: {0}")]
    Transient(String),

    /// Retrying will not help
    #[error("capture failed: {0}")]
    Fatal(String),
}

/// Whole-viewport screenshot primitive
///
/// Implementations return encoded image bytes (PNG or JPEG). Calls must never
/// overlap; `&mut self` makes the pipeline the only caller.
#[async_trait]
pub trait CaptureResource: Send {
    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureFailure>;
}
