use mas_core::{AgentId, MasError};
use mas_layer::LayerError;
use mas_spatial::SpatialError;
use thiserror::Error;

/// Why a thread agent group refused an agent.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("agent carries no identifier")]
    InvalidAgent,

    #[error("agent {0} is already a member")]
    AlreadyMember(AgentId),
}

impl GroupError {
    /// Integer code of the legacy contract: 1 = invalid, 2 = duplicate.
    pub fn code(&self) -> i32 {
        match self {
            GroupError::InvalidAgent     => 1,
            GroupError::AlreadyMember(_) => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no top layer to simulate")]
    NoTopLayer,

    #[error("the top layer holds no agents")]
    NoAgents,

    #[error("agent carries no identifier")]
    InvalidAgent,

    #[error("no thread agent group can take agent {0}")]
    NoThreadAvailable(AgentId),

    #[error("simulation must be initialised first")]
    NotInitialized,

    #[error("action {name:?} refused: {reason}")]
    ActionRefused { name: String, reason: &'static str },

    #[error("action {name:?} failed at t={time}")]
    ActionFailed { name: String, time: f64 },

    #[error("could not build the worker pool: {0}")]
    Pool(String),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Core(#[from] MasError),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

impl SimError {
    /// Integer code for process-level reporting.
    ///
    /// Start-up failures keep their historical values (2 = no top layer,
    /// 3 = no agents); agent registration uses 1 = invalid agent,
    /// 2 = no thread group available, 3 = the group refused the agent.
    pub fn code(&self) -> i32 {
        match self {
            SimError::InvalidAgent         => 1,
            SimError::NoTopLayer           => 2,
            SimError::NoThreadAvailable(_) => 2,
            SimError::NoAgents             => 3,
            SimError::Group(_)             => 3,
            _                              => -1,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
