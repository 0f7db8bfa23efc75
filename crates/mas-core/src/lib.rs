//! `mas-core` — foundational types for the `mas` multi-agent simulation core.
//!
//! This crate is a dependency of every other `mas-*` crate.  It has no
//! `mas-*` dependencies and few external ones (`rand`, `thiserror`,
//! `tracing`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `ThreadId`, `IndexHandle`                  |
//! | [`alloc`]       | `IdAllocator`, `IdRegistry`, `SharedIds`, `IdLease`   |
//! | [`time`]        | `StepClock`                                           |
//! | [`config`]      | `MasConfig`                                           |
//! | [`rng`]         | `SimRng`                                              |
//! | [`message`]     | `Severity`, `MessageSink`, `TracingSink`, `MemorySink`|
//! | [`context`]     | `MasContext` (per-run shared services)                |
//! | [`geom`]        | `Location`, `Color`                                   |
//! | [`error`]       | `MasError`, `MasResult`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids, config and geometry.|

pub mod alloc;
pub mod config;
pub mod context;
pub mod error;
pub mod geom;
pub mod ids;
pub mod message;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use alloc::{IdAllocator, IdLease, IdRegistry, SharedIds};
pub use config::MasConfig;
pub use context::MasContext;
pub use error::{MasError, MasResult};
pub use geom::{Color, Location};
pub use ids::{AgentId, IndexHandle, ThreadId};
pub use message::{MemorySink, Message, MessageSink, Severity, TracingSink};
pub use rng::SimRng;
pub use time::StepClock;
