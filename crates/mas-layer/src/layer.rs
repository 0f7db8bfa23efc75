//! The layer tree: named groupings of agents.
//!
//! A [`Layer`] only *references* agents by identifier; it never owns or drops
//! them.  Ownership belongs to the [`World`](crate::World) wrapping the root.
//!
//! # Roles
//!
//! `Leaf` and `Node` follow the child count: the first child promotes a leaf
//! to a node, removing the last one demotes it back.  `Root` is chosen at
//! construction and never changes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use mas_core::{AgentId, Color, SimRng};

use crate::{LayerError, LayerPath, LayerResult};

// ── LayerRole ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayerRole {
    Root,
    Node,
    Leaf,
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayerRole::Root => "ROOT",
            LayerRole::Node => "NODE",
            LayerRole::Leaf => "LEAF",
        })
    }
}

// ── Layer ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    name:     String,
    role:     LayerRole,
    agents:   BTreeSet<AgentId>,
    children: BTreeMap<String, Layer>,
    color:    Color,
    alpha:    f32,
}

impl Layer {
    /// A childless `Leaf` layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_role(name.into(), LayerRole::Leaf)
    }

    /// A `Root` layer.
    pub fn new_root(name: impl Into<String>) -> Self {
        Self::with_role(name.into(), LayerRole::Root)
    }

    fn with_role(name: String, role: LayerRole) -> Self {
        Self {
            name,
            role,
            agents: BTreeSet::new(),
            children: BTreeMap::new(),
            color: Color::default(),
            alpha: 1.0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn role_name(&self) -> String {
        self.role.to_string()
    }

    // ── Children ──────────────────────────────────────────────────────────

    /// Insert `child` under its name and return it.
    ///
    /// Fails with [`LayerError::DuplicateChild`] when the name is taken; the
    /// existing child is left untouched and the rejected one handed back.
    pub fn add_child(&mut self, child: Layer) -> LayerResult<&mut Layer> {
        use std::collections::btree_map::Entry;
        match self.children.entry(child.name.clone()) {
            Entry::Occupied(_) => Err(LayerError::DuplicateChild {
                name:     child.name.clone(),
                rejected: Box::new(child),
            }),
            Entry::Vacant(slot) => {
                if self.role == LayerRole::Leaf {
                    self.role = LayerRole::Node;
                }
                Ok(slot.insert(child))
            }
        }
    }

    /// Detach the child called `name` and give it back to the caller.
    pub fn remove_child(&mut self, name: &str) -> Option<Layer> {
        let removed = self.children.remove(name)?;
        if self.children.is_empty() && self.role == LayerRole::Node {
            self.role = LayerRole::Leaf;
        }
        Some(removed)
    }

    pub fn child(&self, name: &str) -> Option<&Layer> {
        self.children.get(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.children.get_mut(name)
    }

    /// Child with the smallest name.
    pub fn first_child(&self) -> Option<&Layer> {
        self.children.values().next()
    }

    pub fn children(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.children.values()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// `true` if some layer called `name` sits anywhere below this one.
    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name) || self.children.values().any(|c| c.contains(name))
    }

    /// Descendant at `path`, relative to this layer.
    pub fn find(&self, path: &LayerPath) -> Option<&Layer> {
        path.segments().iter().try_fold(self, |layer, seg| layer.child(seg))
    }

    pub fn find_mut(&mut self, path: &LayerPath) -> Option<&mut Layer> {
        path.segments().iter().try_fold(self, |layer, seg| layer.child_mut(seg))
    }

    /// Paths of this layer and every descendant, parents before children.
    pub fn paths(&self) -> Vec<LayerPath> {
        let mut out = Vec::new();
        self.collect_paths(LayerPath::root(), &mut out);
        out
    }

    fn collect_paths(&self, here: LayerPath, out: &mut Vec<LayerPath>) {
        out.push(here.clone());
        for child in self.children.values() {
            child.collect_paths(here.child(&child.name), out);
        }
    }

    // ── Agents ────────────────────────────────────────────────────────────

    /// Reference `id` from this layer.  Returns `false` if already present.
    pub fn add_agent(&mut self, id: AgentId) -> bool {
        self.agents.insert(id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        self.agents.remove(&id)
    }

    /// Drop every reference to `id` in this subtree.  Returns how many layers
    /// referenced it.
    pub fn forget_agent(&mut self, id: AgentId) -> usize {
        let here = usize::from(self.agents.remove(&id));
        here + self.children.values_mut().map(|c| c.forget_agent(id)).sum::<usize>()
    }

    /// Directly referenced agents.
    pub fn agents(&self) -> &BTreeSet<AgentId> {
        &self.agents
    }

    #[inline]
    pub fn has_agent(&self, id: AgentId) -> bool {
        self.agents.contains(&id)
    }

    /// Union of the direct agents of every descendant, each once.
    pub fn get_unique_sub_agents(&self) -> BTreeSet<AgentId> {
        let mut out = BTreeSet::new();
        self.collect_sub_agents(&mut out);
        out
    }

    fn collect_sub_agents(&self, out: &mut BTreeSet<AgentId>) {
        for child in self.children.values() {
            out.extend(child.agents.iter().copied());
            child.collect_sub_agents(out);
        }
    }

    /// Direct agents plus [`get_unique_sub_agents`](Self::get_unique_sub_agents).
    pub fn get_unique_agents_and_sub_agents(&self) -> BTreeSet<AgentId> {
        let mut out = self.agents.clone();
        self.collect_sub_agents(&mut out);
        out
    }

    /// Initialise children first; a `Root` then replaces its direct agents
    /// by the unique agents of its descendants.
    pub fn init(&mut self) {
        for child in self.children.values_mut() {
            child.init();
        }
        if self.role == LayerRole::Root {
            self.agents = self.get_unique_sub_agents();
        }
    }

    /// `n` distinct direct agents drawn uniformly at random.
    ///
    /// Returns every agent when `n` equals the count.
    ///
    /// # Panics
    /// Panics if `n` exceeds the number of direct agents.
    pub fn get_n_random_agent(&self, n: usize, rng: &mut SimRng) -> BTreeSet<AgentId> {
        assert!(
            n <= self.agents.len(),
            "requested {n} agents from layer {:?} holding {}",
            self.name,
            self.agents.len()
        );
        if n >= self.agents.len() {
            return self.agents.clone();
        }
        let pool: Vec<AgentId> = self.agents.iter().copied().collect();
        let mut picked = BTreeSet::new();
        while picked.len() < n {
            picked.insert(pool[rng.index(pool.len())]);
        }
        picked
    }

    /// One direct agent drawn uniformly at random.
    pub fn get_one_random_agent(&self, rng: &mut SimRng) -> Option<AgentId> {
        if self.agents.is_empty() {
            return None;
        }
        self.agents.iter().nth(rng.index(self.agents.len())).copied()
    }

    // ── Display ───────────────────────────────────────────────────────────

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Rendering hook; the core never draws.
    pub fn draw(&self) {}
}
