//! Error types for `mas-agent`.

use mas_core::AgentId;
use thiserror::Error;

/// Why [`AgentState`](crate::AgentState) could not move forward.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// Expected terminal condition: the agent is (now) dead.
    #[error("no next state")]
    NoNextState,

    /// The raw state value is outside the enumeration.
    #[error("unknown state {0}")]
    UnknownState(u8),
}

impl TransitionError {
    /// Integer code of the legacy contract: 1 = no next state, 2 = unknown.
    pub fn code(&self) -> i32 {
        match self {
            TransitionError::NoNextState     => 1,
            TransitionError::UnknownState(_) => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent carries no identifier")]
    Unassigned,

    #[error("agent {0} is already stored")]
    Duplicate(AgentId),

    #[error("agent {0} not found")]
    NotFound(AgentId),

    /// A lifecycle hook (`init`, `start`, `exec`) failed.
    #[error("agent {agent}: {reason}")]
    Hook { agent: AgentId, reason: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

pub type AgentResult<T = ()> = Result<T, AgentError>;
