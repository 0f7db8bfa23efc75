//! The set of live spatial indices of one simulation run.
//!
//! Each index is registered together with the layer whose agents it
//! indexes, so anything holding a layer path can refresh every index
//! reachable from it without holding the indices themselves.

use std::collections::BTreeMap;

use mas_core::{IndexHandle, MasContext, Severity};
use mas_layer::{LayerPath, World};

use crate::{SpatialError, SpatialIndex, SpatialResult};

/// Named allocator handing out [`IndexHandle`]s.
pub const HANDLE_ALLOCATOR: &str = "spatial-index";

const SOURCE: &str = "IndexRegistry";

struct Registered {
    layer: LayerPath,
    index: Box<dyn SpatialIndex>,
}

impl Registered {
    fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    fn index_mut(&mut self) -> &mut dyn SpatialIndex {
        self.index.as_mut()
    }
}

pub struct IndexRegistry {
    ctx:     MasContext,
    entries: BTreeMap<IndexHandle, Registered>,
}

impl IndexRegistry {
    pub fn new(ctx: MasContext) -> Self {
        Self { ctx, entries: BTreeMap::new() }
    }

    /// Take ownership of `index`, which indexes the agents under `layer`.
    pub fn register(
        &mut self,
        layer: LayerPath,
        index: Box<dyn SpatialIndex>,
    ) -> SpatialResult<IndexHandle> {
        let raw = self.ctx.ids().allocate_for(HANDLE_ALLOCATOR, self.ctx.sink());
        if raw == 0 {
            return Err(SpatialError::HandlesExhausted);
        }
        let handle = IndexHandle(raw);
        self.ctx.message(
            Severity::Debug,
            &format!("registered index {} for layer {layer} as {handle}", index.name()),
            SOURCE,
        );
        self.entries.insert(handle, Registered { layer, index });
        Ok(handle)
    }

    /// Remove an index and hand it back; its handle may be reused.
    pub fn unregister(&mut self, handle: IndexHandle) -> SpatialResult<Box<dyn SpatialIndex>> {
        let entry = self.entries.remove(&handle).ok_or(SpatialError::UnknownHandle(handle))?;
        self.ctx.ids().release_for(HANDLE_ALLOCATOR, handle.raw());
        Ok(entry.index)
    }

    #[inline]
    pub fn is_registered(&self, handle: IndexHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn get(&self, handle: IndexHandle) -> Option<&dyn SpatialIndex> {
        self.entries.get(&handle).map(Registered::index)
    }

    pub fn get_mut(&mut self, handle: IndexHandle) -> Option<&mut dyn SpatialIndex> {
        self.entries.get_mut(&handle).map(Registered::index_mut)
    }

    /// Layer the index was registered for.
    pub fn layer_of(&self, handle: IndexHandle) -> Option<&LayerPath> {
        self.entries.get(&handle).map(|e| &e.layer)
    }

    /// Handles of the indices registered for exactly `layer`.
    pub fn handles_for(&self, layer: &LayerPath) -> Vec<IndexHandle> {
        self.entries
            .iter()
            .filter(|(_, e)| &e.layer == layer)
            .map(|(&h, _)| h)
            .collect()
    }

    /// Rebuild every index whose layer is `top` or lies below it, from the
    /// current locations of that layer's agents.  Returns how many indices
    /// were rebuilt.
    pub fn refresh_reachable(&mut self, world: &World, top: &LayerPath) -> usize {
        let mut refreshed = 0;
        for entry in self.entries.values_mut() {
            if !entry.layer.is_within(top) {
                continue;
            }
            let Some(layer) = world.layer(&entry.layer) else {
                self.ctx.message(
                    Severity::Warning,
                    &format!("index {} refers to missing layer {}", entry.index.name(), entry.layer),
                    SOURCE,
                );
                continue;
            };
            let locations = world.store().locations(layer.get_unique_agents_and_sub_agents());
            entry.index.rebuild(&locations, self.ctx.sink());
            refreshed += 1;
        }
        refreshed
    }

    /// Rebuild every registered index.
    pub fn refresh_all(&mut self, world: &World) -> usize {
        self.refresh_reachable(world, &LayerPath::root())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(h, e)| (h, (e.index.name(), &e.layer))))
            .finish()
    }
}
