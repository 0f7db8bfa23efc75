//! Error types for `mas-layer`.

use mas_agent::AgentError;
use thiserror::Error;

use crate::{Layer, LayerPath};

#[derive(Debug, Error)]
pub enum LayerError {
    /// A sibling already uses this name.  The rejected layer is handed back
    /// untouched so the caller can rename or drop it.
    #[error("layer already has a child named {name:?}")]
    DuplicateChild { name: String, rejected: Box<Layer> },

    #[error("no layer at {0}")]
    NoSuchLayer(LayerPath),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type LayerResult<T> = Result<T, LayerError>;
