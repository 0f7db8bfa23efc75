//! Spatial-subsystem error type.

use thiserror::Error;

use mas_core::IndexHandle;

/// Errors produced by `mas-spatial`.
#[derive(Debug, Error, PartialEq)]
pub enum SpatialError {
    #[error("bounding region has min > max on axis {axis}")]
    InvalidBounds { axis: usize },

    #[error("bucket capacity must be at least 1")]
    ZeroCapacity,

    #[error("no more spatial index handles available")]
    HandlesExhausted,

    #[error("index {0} is not registered")]
    UnknownHandle(IndexHandle),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
