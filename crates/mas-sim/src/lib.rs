//! `mas-sim` — step loop orchestrator for the mas simulation core.
//!
//! # One step
//!
//! ```text
//! clock      — StepClock computes the next duration; zero ends the run
//! pre        — due EachBegin / PunctualBefore actions
//! sync       — thread groups follow agents spawned or destroyed under the top layer
//! tag        — all agents, or `agents_per_step` chosen by the AgentSampler
//! run + join — every ThreadAgentGroup on the rayon pool, inside one scope
//! solve      — forces become move requests; ConflictSolvers adjudicate
//! commit     — accepted requests become positions
//! refresh    — spatial indices under the top layer are rebuilt
//! post       — due EachEnd / PunctualAfter actions
//! notify     — SimObserver::on_step_completed
//! ```
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | `group`     | `ThreadAgentGroup`, `process_agent`                       |
//! | `solver`    | `ConflictSolver`, `SpatialConflictSolver`                 |
//! | `sampler`   | `AgentSampler`, `UniformSampler`, `FairSampler`           |
//! | `action`    | `Action`, `ActionFrequency`, `FnAction`                   |
//! | `scheduler` | `Scheduler`: clock plus pre/post action queues            |
//! | `manager`   | `SimulationManager`, `StepReport`                         |
//! | `sim`       | `Simulation`, `RunState`, `StopHandle`                    |
//! | `builder`   | `SimBuilder`                                              |
//! | `observer`  | `SimObserver`, `NoopObserver`                             |
//!
//! # Cargo features
//!
//! | Feature   | Effect                                                    |
//! |-----------|-----------------------------------------------------------|
//! | `fx-hash` | Uses FxHash for the agent → thread group map.             |
//! | `serde`   | Derives serde traits on config, ids and plain data types. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use mas_core::{MasConfig, MasContext};
//! use mas_layer::{Layer, LayerPath, World};
//! use mas_sim::{NoopObserver, SimBuilder};
//!
//! let mut world = World::new(MasContext::new(), "world");
//! let crowd = world.add_layer(&LayerPath::root(), Layer::new("crowd"))?;
//! world.spawn(&crowd, Box::new(my_agent))?;
//! let mut sim = SimBuilder::new(MasConfig::default(), world).build()?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod action;
pub mod builder;
pub mod error;
pub mod group;
pub mod manager;
pub mod observer;
pub mod sampler;
pub mod scheduler;
pub mod sim;
pub mod solver;

#[cfg(test)]
mod tests;

pub use action::{Action, ActionFrequency, FnAction};
pub use builder::SimBuilder;
pub use error::{GroupError, SimError, SimResult};
pub use group::{ThreadAgentGroup, process_agent};
pub use manager::{SimulationManager, StepReport, THREAD_ALLOCATOR};
pub use observer::{NoopObserver, SimObserver};
pub use sampler::{AgentSampler, FairSampler, UniformSampler};
pub use scheduler::Scheduler;
pub use sim::{RunState, Simulation, StopHandle};
pub use solver::{ConflictSolver, MAX_SOLVE_ITERATIONS, SpatialConflictSolver};
