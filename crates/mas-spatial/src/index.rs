//! Dimension-erased view of a spatial index.

use std::collections::BTreeSet;

use mas_core::{AgentId, Location, MessageSink};

use crate::geometry::SpacePoint;
use crate::leaf::LeafIndex;
use crate::{Octree, Site};

/// What the simulation and transport layers need from any spatial index.
///
/// Query points are always 3-D; two-dimensional indices ignore `z`.
pub trait SpatialIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Nearest agent by the index's leaf metric.
    fn nearest(&self, point: [f64; 3]) -> Option<AgentId>;

    /// Agent whose extent contains `point`.
    fn locate(&self, point: [f64; 3]) -> Option<AgentId>;

    fn contained_agents(&self) -> BTreeSet<AgentId>;

    /// Replace the content by `locations`.  Returns how many were indexed;
    /// the rest are reported to `sink`.
    fn rebuild(&mut self, locations: &[(AgentId, Location)], sink: &dyn MessageSink) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: SpacePoint, L: LeafIndex<P>> SpatialIndex for Octree<P, L> {
    fn name(&self) -> &str {
        Octree::name(self)
    }

    fn nearest(&self, point: [f64; 3]) -> Option<AgentId> {
        Octree::nearest(self, &P::from_xyz(point))
    }

    fn locate(&self, point: [f64; 3]) -> Option<AgentId> {
        Octree::locate(self, &P::from_xyz(point))
    }

    fn contained_agents(&self) -> BTreeSet<AgentId> {
        Octree::contained_agents(self)
    }

    fn rebuild(&mut self, locations: &[(AgentId, Location)], sink: &dyn MessageSink) -> usize {
        self.construct(
            locations.iter().map(|(agent, loc)| Site::from_location(*agent, loc)),
            sink,
        )
    }

    fn len(&self) -> usize {
        Octree::len(self)
    }
}
