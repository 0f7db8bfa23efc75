//! `mas-layer` — hierarchical grouping of agents.
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`layer`]    | `Layer`, `LayerRole` (referencing container)            |
//! | [`path`]     | `LayerPath`                                             |
//! | [`world`]    | `World` (owning container: root layer + agent store)    |
//! | [`error`]    | `LayerError`, `LayerResult`                             |
//!
//! Exactly one container in a tree owns agents: the [`World`].  Every
//! [`Layer`], the root included, only holds identifiers.

pub mod error;
pub mod layer;
pub mod path;
pub mod world;


pub use error::{LayerError, LayerResult};
pub use layer::{Layer, LayerRole};
pub use path::LayerPath;
pub use world::World;
