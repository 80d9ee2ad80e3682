use thiserror::Error;

use crate::sensor::error::SensorError;

/// Preview pipeline construction and lifecycle errors.
///
/// Per-frame problems never surface here; they are counted and skipped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported depth sample size: {0} bytes (expected 2)")]
    UnsupportedSampleSize(u32),

    #[error("frame geometry has no pixels: {width}x{height}")]
    EmptyGeometry { width: u32, height: u32 },

    #[error("surface expects {expected} bytes, got {actual}")]
    SurfaceSize { expected: usize, actual: usize },

    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
