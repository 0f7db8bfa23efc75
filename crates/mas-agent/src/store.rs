//! The owning agent arena.
//!
//! `AgentStore` is the only place agents are dropped.  Layers, thread groups
//! and spatial indices refer to agents by [`AgentId`] and borrow them from
//! the store when they need to.

use std::collections::BTreeMap;

use mas_core::{AgentId, Location};

use crate::{Agent, AgentError, AgentResult};

// ── AgentSlot ─────────────────────────────────────────────────────────────────

/// A stored agent plus the capabilities recorded when it was inserted.
pub struct AgentSlot {
    agent:   Box<dyn Agent>,
    spatial: bool,
    dynamic: bool,
}

impl AgentSlot {
    fn new(agent: Box<dyn Agent>) -> Self {
        let spatial = agent.location().is_some();
        let dynamic = agent.motion().is_some();
        Self { agent, spatial, dynamic }
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    pub fn agent_mut(&mut self) -> &mut dyn Agent {
        self.agent.as_mut()
    }

    #[inline]
    pub fn is_spatial(&self) -> bool {
        self.spatial
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

// ── AgentStore ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct AgentStore {
    slots: BTreeMap<AgentId, AgentSlot>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `agent`, recording its capabilities.
    ///
    /// Fails when the agent has no identifier or its identifier is already
    /// stored; the rejected agent is dropped.
    pub fn insert(&mut self, agent: Box<dyn Agent>) -> AgentResult<AgentId> {
        let id = agent.id();
        if !id.is_assigned() {
            return Err(AgentError::Unassigned);
        }
        if self.slots.contains_key(&id) {
            return Err(AgentError::Duplicate(id));
        }
        self.slots.insert(id, AgentSlot::new(agent));
        Ok(id)
    }

    /// Remove and return an agent.  Dropping the returned box destroys it.
    pub fn remove(&mut self, id: AgentId) -> Option<Box<dyn Agent>> {
        self.slots.remove(&id).map(|slot| slot.agent)
    }

    pub fn get(&self, id: AgentId) -> Option<&dyn Agent> {
        self.slots.get(&id).map(AgentSlot::agent)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut dyn Agent> {
        self.slots.get_mut(&id).map(AgentSlot::agent_mut)
    }

    pub fn slot(&self, id: AgentId) -> Option<&AgentSlot> {
        self.slots.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.slots.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Stored identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.slots.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &dyn Agent)> + '_ {
        self.slots.iter().map(|(&id, slot)| (id, slot.agent()))
    }

    /// `true` if the agent was spatial when inserted.
    pub fn is_spatial(&self, id: AgentId) -> bool {
        self.slots.get(&id).is_some_and(AgentSlot::is_spatial)
    }

    /// `true` if the agent was dynamic when inserted.
    pub fn is_dynamic(&self, id: AgentId) -> bool {
        self.slots.get(&id).is_some_and(AgentSlot::is_dynamic)
    }

    /// Current locations of the spatial agents among `ids`.
    ///
    /// Unknown and non-spatial identifiers are skipped.
    pub fn locations<I>(&self, ids: I) -> Vec<(AgentId, Location)>
    where
        I: IntoIterator<Item = AgentId>,
    {
        ids.into_iter()
            .filter_map(|id| {
                let slot = self.slots.get(&id).filter(|s| s.spatial)?;
                slot.agent.location().map(|loc| (id, loc))
            })
            .collect()
    }

    /// Split the store into disjoint mutable batches.
    ///
    /// `assign` maps each agent to its batch key; agents mapped to `None` are
    /// left out.  Each agent appears in at most one batch, which is what lets
    /// the batches run on different threads without locking.
    pub fn partition_mut<K, F>(&mut self, mut assign: F) -> BTreeMap<K, Vec<&mut dyn Agent>>
    where
        K: Ord,
        F: FnMut(AgentId) -> Option<K>,
    {
        let mut batches: BTreeMap<K, Vec<&mut dyn Agent>> = BTreeMap::new();
        for (&id, slot) in self.slots.iter_mut() {
            if let Some(key) = assign(id) {
                batches.entry(key).or_default().push(slot.agent_mut());
            }
        }
        batches
    }
}

impl std::fmt::Debug for AgentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentStore").field("len", &self.slots.len()).finish()
    }
}
