//! `mas-spatial` — spatial indexing of agents.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                 |
//! |----------------|----------------------------------------------------------|
//! | [`geometry`]   | `SpacePoint`, `Bounds`, `Site`                           |
//! | [`leaf`]       | `LeafIndex` strategies: `CenterScan`, `PowerLocator`     |
//! | [`octree`]     | `Octree`, `Quadtree`                                     |
//! | [`index`]      | `SpatialIndex` (dimension-erased trait)                  |
//! | [`registry`]   | `IndexRegistry` (indices per layer, mass refresh)        |
//! | [`error`]      | `SpatialError`, `SpatialResult`                          |
//!
//! # Refresh policy
//!
//! Indices are rebuilt from scratch after every simulation step from the
//! current locations of their layer's agents.

pub mod error;
pub mod geometry;
pub mod index;
pub mod leaf;
pub mod octree;
pub mod registry;


pub use error::{SpatialError, SpatialResult};
pub use geometry::{Bounds, Site, SpacePoint};
pub use index::SpatialIndex;
pub use leaf::{CenterScan, LeafIndex, PowerLocator};
pub use octree::{MAX_DEPTH, Octree, Quadtree};
pub use registry::{HANDLE_ALLOCATOR, IndexRegistry};
