//! `mas-agent` — agents, their lifecycle and the store that owns them.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`state`]     | `AgentState` and the forward transition table               |
//! | [`body`]      | `Body` trait, `InertBody`                                   |
//! | [`motion`]    | `Motion` (force → requested position → commit)              |
//! | [`agent`]     | `Agent` trait, `AgentCore`, `StepContext`                   |
//! | [`store`]     | `AgentStore` (owning arena), `AgentSlot`                    |
//! | [`error`]     | `AgentError`, `TransitionError`, `AgentResult`              |
//!
//! # Ownership
//!
//! Agents live in exactly one [`AgentStore`].  Dropping an agent drops its
//! body and returns its identifier to the run's registry.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on value types.          |

pub mod agent;
pub mod body;
pub mod error;
pub mod motion;
pub mod state;
pub mod store;


pub use agent::{Agent, AgentCore, StepContext};
pub use body::{Body, InertBody};
pub use error::{AgentError, AgentResult, TransitionError};
pub use motion::Motion;
pub use state::AgentState;
pub use store::{AgentSlot, AgentStore};
