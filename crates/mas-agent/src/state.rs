//! The agent lifecycle state machine.
//!
//! ```text
//!   Uninitialized ──► WaitingToStart ──► Running ──► Dead
//!                            ▲              ▲
//!                            └── Stopped ───┘   (restart path)
//! ```
//!
//! Transitions only move forward, except the `Stopped → Running` restart.

use std::fmt;

use crate::TransitionError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AgentState {
    #[default]
    Uninitialized  = 0,
    WaitingToStart = 1,
    Running        = 2,
    Stopped        = 3,
    Dead           = 4,
}

impl AgentState {
    pub const ALL: [AgentState; 5] = [
        AgentState::Uninitialized,
        AgentState::WaitingToStart,
        AgentState::Running,
        AgentState::Stopped,
        AgentState::Dead,
    ];

    /// Decode a raw value, `None` when it is outside the enumeration.
    pub fn from_raw(raw: u8) -> Option<AgentState> {
        AgentState::ALL.get(raw as usize).copied()
    }

    #[inline]
    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// `true` for states that have been through `start()` at least once.
    pub fn has_started(self) -> bool {
        matches!(self, AgentState::Running | AgentState::Stopped | AgentState::Dead)
    }
}

impl TryFrom<u8> for AgentState {
    type Error = TransitionError;
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        AgentState::from_raw(raw).ok_or(TransitionError::UnknownState(raw))
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentState::Uninitialized  => "UNINITIALIZED",
            AgentState::WaitingToStart => "WAITING_FOR_START",
            AgentState::Running        => "RUNNING",
            AgentState::Stopped        => "STOPPED",
            AgentState::Dead           => "DEAD",
        };
        f.write_str(s)
    }
}

/// The forward transition table on raw state values.
///
/// Returns the state to store and whether the transition "succeeded".
/// `Running` moves to `Dead` but still reports [`TransitionError::NoNextState`].
pub fn next_logical_state(raw: u8) -> (Option<AgentState>, Result<(), TransitionError>) {
    match AgentState::from_raw(raw) {
        Some(AgentState::Uninitialized) => (Some(AgentState::WaitingToStart), Ok(())),
        Some(AgentState::WaitingToStart | AgentState::Stopped) => {
            (Some(AgentState::Running), Ok(()))
        }
        Some(AgentState::Running) => (Some(AgentState::Dead), Err(TransitionError::NoNextState)),
        Some(AgentState::Dead) => (None, Err(TransitionError::NoNextState)),
        None => (None, Err(TransitionError::UnknownState(raw))),
    }
}
