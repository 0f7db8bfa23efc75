//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `MasError` as one variant
//! where they need to surface a core failure.

use thiserror::Error;

use crate::AgentId;

/// The top-level error type for `mas-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum MasError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("duration must be strictly positive, got {0}")]
    InvalidDuration(f64),

    #[error("identifier pool exhausted")]
    IdsExhausted,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for all `mas-*` crates.
pub type MasResult<T> = Result<T, MasError>;
