//! The owning container: a root layer plus the store holding its agents.

use std::collections::BTreeSet;

use mas_agent::{Agent, AgentStore};
use mas_core::{AgentId, MasContext, Severity};

use crate::{Layer, LayerError, LayerPath, LayerResult};

const SOURCE: &str = "World";

/// Root of a layer tree together with every agent the tree references.
///
/// Inner layers only hold identifiers; the world is the single place agents
/// are created into and destroyed from.  Dropping the world drops each agent
/// exactly once.
pub struct World {
    ctx:   MasContext,
    root:  Layer,
    store: AgentStore,
}

impl World {
    pub fn new(ctx: MasContext, name: impl Into<String>) -> Self {
        Self { ctx, root: Layer::new_root(name), store: AgentStore::new() }
    }

    #[inline]
    pub fn ctx(&self) -> &MasContext {
        &self.ctx
    }

    #[inline]
    pub fn root(&self) -> &Layer {
        &self.root
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut Layer {
        &mut self.root
    }

    #[inline]
    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut AgentStore {
        &mut self.store
    }

    /// The layer tree and the store, borrowed at once.
    pub fn split_mut(&mut self) -> (&Layer, &mut AgentStore) {
        (&self.root, &mut self.store)
    }

    pub fn layer(&self, path: &LayerPath) -> Option<&Layer> {
        self.root.find(path)
    }

    pub fn layer_mut(&mut self, path: &LayerPath) -> Option<&mut Layer> {
        self.root.find_mut(path)
    }

    /// Add `child` under the layer at `parent`.
    pub fn add_layer(&mut self, parent: &LayerPath, child: Layer) -> LayerResult<LayerPath> {
        let path = parent.child(child.name());
        let layer = self
            .root
            .find_mut(parent)
            .ok_or_else(|| LayerError::NoSuchLayer(parent.clone()))?;
        layer.add_child(child)?;
        Ok(path)
    }

    /// Take ownership of `agent` and reference it from the layer at `path`.
    pub fn spawn(&mut self, path: &LayerPath, agent: Box<dyn Agent>) -> LayerResult<AgentId> {
        if self.root.find(path).is_none() {
            return Err(LayerError::NoSuchLayer(path.clone()));
        }
        let id = self.store.insert(agent)?;
        if let Some(layer) = self.root.find_mut(path) {
            layer.add_agent(id);
        }
        Ok(id)
    }

    /// Reference an already owned agent from one more layer.
    pub fn attach(&mut self, path: &LayerPath, id: AgentId) -> LayerResult<bool> {
        if !self.store.contains(id) {
            return Err(mas_agent::AgentError::NotFound(id).into());
        }
        let layer = self
            .root
            .find_mut(path)
            .ok_or_else(|| LayerError::NoSuchLayer(path.clone()))?;
        Ok(layer.add_agent(id))
    }

    /// Remove the reference held by the layer at `path`; the agent lives on.
    pub fn detach(&mut self, path: &LayerPath, id: AgentId) -> bool {
        self.root.find_mut(path).is_some_and(|layer| layer.remove_agent(id))
    }

    /// Forget `id` in every layer and drop the agent.
    pub fn destroy_agent(&mut self, id: AgentId) -> bool {
        self.root.forget_agent(id);
        match self.store.remove(id) {
            Some(agent) => {
                self.ctx.message(Severity::Debug, &format!("destroying agent {id}"), SOURCE);
                drop(agent);
                true
            }
            None => false,
        }
    }

    /// Initialise the tree; afterwards the root's direct agents are the
    /// working set.
    pub fn init(&mut self) {
        self.root.init();
        let dangling = self.root.agents().iter().filter(|id| !self.store.contains(**id)).count();
        if dangling > 0 {
            self.ctx.message(
                Severity::Warning,
                &format!("{dangling} referenced agents are not owned by the world"),
                SOURCE,
            );
        }
    }

    /// Agents the root currently iterates over.
    pub fn working_set(&self) -> &BTreeSet<AgentId> {
        self.root.agents()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("root", &self.root.name())
            .field("agents", &self.store.len())
            .finish()
    }
}
