//! Octree (and quadtree) spatial index over agent sites.
//!
//! # Construction
//!
//! Construction is two-phase.  Every site is first inserted by plain
//! subdivision: a leaf bucket holding more than `capacity` sites splits into
//! `2^D` equal children at its midpoint and redistributes them.  Only once all
//! sites are placed does each leaf build its [`LeafIndex`] over exactly the
//! sites it ended up with.
//!
//! # Extension length
//!
//! Sites have a radius.  The tree's extension length is the largest radius
//! seen, and a site is stored in every bucket whose region grown by that
//! length contains its center.  Any sphere covering a point is therefore
//! present in the leaf containing that point, which keeps
//! [`Octree::locate`] exact near bucket borders.
//!
//! # Splitting limits
//!
//! A bucket stops splitting at depth [`MAX_DEPTH`], when all its sites share
//! one center, or when two or more children would each receive every site
//! (sites much closer together than the extension length).

use std::collections::{BTreeMap, BTreeSet};

use mas_core::{AgentId, MessageSink, Severity};

use crate::geometry::SpacePoint;
use crate::leaf::{CenterScan, LeafIndex};
use crate::{Bounds, Site, SpatialError, SpatialResult};

/// Deepest level a bucket may reach.
pub const MAX_DEPTH: usize = 40;

const SOURCE: &str = "Octree";

// ── Bucket ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Bucket<P: SpacePoint, L> {
    region:   Bounds<P>,
    depth:    usize,
    sites:    Vec<Site<P>>,
    children: Vec<Bucket<P, L>>,
    leaf:     L,
    /// Sites changed since `leaf` was last built.
    stale:    bool,
}

impl<P: SpacePoint, L: LeafIndex<P>> Bucket<P, L> {
    fn new(region: Bounds<P>, depth: usize) -> Self {
        Self {
            region,
            depth,
            sites: Vec::new(),
            children: Vec::new(),
            leaf: L::default(),
            stale: false,
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, site: &Site<P>, ext: f64, capacity: usize) -> bool {
        if !self.region.grown(ext).contains(&site.center) {
            return false;
        }
        if !self.is_leaf() {
            let mut added = false;
            for child in &mut self.children {
                added |= child.insert(site, ext, capacity);
            }
            return added;
        }
        self.sites.push(*site);
        self.stale = true;
        if self.depth < MAX_DEPTH && self.sites.len() > capacity && self.split_is_useful(ext) {
            self.subdivide(ext, capacity);
        }
        true
    }

    fn split_is_useful(&self, ext: f64) -> bool {
        let Some(first) = self.sites.first() else {
            return false;
        };
        if self.sites.iter().all(|s| s.center == first.center) {
            return false;
        }
        let saturated = (0..1usize << P::DIMENSIONS)
            .filter(|&i| {
                let grown = self.region.orthant(i).grown(ext);
                self.sites.iter().all(|s| grown.contains(&s.center))
            })
            .count();
        saturated < 2
    }

    fn subdivide(&mut self, ext: f64, capacity: usize) {
        self.children = (0..1usize << P::DIMENSIONS)
            .map(|i| Bucket::new(self.region.orthant(i), self.depth + 1))
            .collect();
        for site in std::mem::take(&mut self.sites) {
            for child in &mut self.children {
                child.insert(&site, ext, capacity);
            }
        }
        self.leaf.clear();
        self.stale = false;
    }

    fn remove(&mut self, site: &Site<P>, ext: f64) -> bool {
        if !self.region.grown(ext).contains(&site.center) {
            return false;
        }
        if self.is_leaf() {
            let before = self.sites.len();
            self.sites.retain(|s| s.agent != site.agent);
            let removed = self.sites.len() != before;
            self.stale |= removed;
            return removed;
        }
        let mut removed = false;
        for child in &mut self.children {
            removed |= child.remove(site, ext);
        }
        removed
    }

    fn initialize(&mut self) {
        if self.is_leaf() {
            if self.stale {
                self.leaf.build(&self.sites);
                self.stale = false;
            }
            return;
        }
        for child in &mut self.children {
            child.initialize();
        }
    }

    fn collect(&self, out: &mut BTreeSet<AgentId>) {
        if self.is_leaf() {
            out.extend(self.sites.iter().map(|s| s.agent));
            return;
        }
        for child in &self.children {
            child.collect(out);
        }
    }

    /// Branch-and-bound: children are visited by increasing lower bound and
    /// skipped once the bound cannot beat `best`.
    fn nearest_into(&self, point: &P, ext: f64, best: &mut Option<(f64, AgentId)>) {
        if self.is_leaf() {
            if let Some((slot, score)) = self.leaf.nearest(&self.sites, point) {
                if let Some(site) = self.sites.get(slot) {
                    if best.is_none_or(|(b, _)| score < b) {
                        *best = Some((score, site.agent));
                    }
                }
            }
            return;
        }
        let mut order: Vec<(f64, &Bucket<P, L>)> = self
            .children
            .iter()
            .map(|c| (L::lower_bound(c.region.grown(ext).distance_sq(point), ext), c))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (bound, child) in order {
            if best.is_some_and(|(b, _)| bound >= b) {
                break;
            }
            child.nearest_into(point, ext, best);
        }
    }

    fn locate(&self, point: &P) -> Option<AgentId> {
        if !self.region.contains(point) {
            return None;
        }
        if self.is_leaf() {
            return self
                .sites
                .iter()
                .map(|s| (s.power_distance(point), s.agent))
                .filter(|(pd, _)| *pd <= 0.0)
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, agent)| agent);
        }
        self.children.iter().find(|c| c.region.contains(point))?.locate(point)
    }

    fn candidates(&self, area: &Bounds<P>, ext: f64, out: &mut BTreeMap<AgentId, Site<P>>) {
        if !self.region.grown(ext).intersects(area) {
            return;
        }
        if self.is_leaf() {
            out.extend(self.sites.iter().map(|s| (s.agent, *s)));
            return;
        }
        for child in &self.children {
            child.candidates(area, ext, out);
        }
    }

    fn max_depth(&self) -> usize {
        self.children.iter().map(Bucket::max_depth).max().unwrap_or(self.depth)
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Bucket::count).sum::<usize>()
    }
}

// ── Octree ────────────────────────────────────────────────────────────────────

/// Bucketed spatial index over agent sites.
///
/// `P` picks the dimension (`[f64; 3]` for an octree, `[f64; 2]` for a
/// quadtree) and `L` the per-leaf nearest-site strategy.
#[derive(Debug)]
pub struct Octree<P: SpacePoint = [f64; 3], L: LeafIndex<P> = CenterScan> {
    name:      String,
    root:      Bucket<P, L>,
    capacity:  usize,
    extension: f64,
    sites:     BTreeMap<AgentId, Site<P>>,
}

/// Two-dimensional variant: four children per split.
pub type Quadtree<L = CenterScan> = Octree<[f64; 2], L>;

impl<P: SpacePoint, L: LeafIndex<P>> Octree<P, L> {
    /// Empty index over `region`; leaves split beyond `capacity` sites.
    pub fn new(name: impl Into<String>, region: Bounds<P>, capacity: usize) -> SpatialResult<Self> {
        if let Some(axis) = region.inverted_axis() {
            return Err(SpatialError::InvalidBounds { axis });
        }
        if capacity == 0 {
            return Err(SpatialError::ZeroCapacity);
        }
        Ok(Self {
            name: name.into(),
            root: Bucket::new(region, 0),
            capacity,
            extension: 0.0,
            sites: BTreeMap::new(),
        })
    }

    /// Replace the content by `sites`, then build every leaf index.
    ///
    /// Sites whose center is outside the region are skipped and reported to
    /// `sink` as "cannot process".  Returns the number of sites indexed.
    pub fn construct<I>(&mut self, sites: I, sink: &dyn MessageSink) -> usize
    where
        I: IntoIterator<Item = Site<P>>,
    {
        let rejected = self.fill(sites.into_iter().collect());
        for site in &rejected {
            sink.message(
                Severity::CannotProcess,
                &format!(
                    "unable to add agent {} at {:?} to {}",
                    site.agent,
                    site.center.to_xyz(),
                    self.name
                ),
                SOURCE,
            );
        }
        self.sites.len()
    }

    /// Rebuild from scratch; returns the sites that did not fit.
    fn fill(&mut self, sites: Vec<Site<P>>) -> Vec<Site<P>> {
        self.clear();
        self.extension = sites.iter().map(|s| s.radius).fold(0.0, f64::max);
        let rejected = sites.into_iter().filter(|s| !self.insert_raw(s)).collect();
        self.root.initialize();
        rejected
    }

    fn insert_raw(&mut self, site: &Site<P>) -> bool {
        if !self.root.region.contains(&site.center) {
            return false;
        }
        if !self.root.insert(site, self.extension, self.capacity) {
            return false;
        }
        self.sites.insert(site.agent, *site);
        true
    }

    /// Insert one site, replacing any previous site of the same agent.
    ///
    /// Returns `false` if the center lies outside the region.  A radius larger
    /// than the current extension length triggers a full rebuild.
    pub fn add(&mut self, site: Site<P>) -> bool {
        if !self.root.region.contains(&site.center) {
            return false;
        }
        self.remove(site.agent);
        if site.radius > self.extension {
            let mut all: Vec<Site<P>> = self.sites.values().copied().collect();
            all.push(site);
            return self.fill(all).is_empty();
        }
        let added = self.insert_raw(&site);
        self.root.initialize();
        added
    }

    /// Drop `agent` from every bucket holding it.
    pub fn remove(&mut self, agent: AgentId) -> bool {
        let Some(site) = self.sites.remove(&agent) else {
            return false;
        };
        self.root.remove(&site, self.extension);
        self.root.initialize();
        true
    }

    /// Empty the index back to a single leaf bucket.
    pub fn clear(&mut self) {
        self.root = Bucket::new(self.root.region, 0);
        self.sites.clear();
        self.extension = 0.0;
    }

    /// The site minimising the leaf metric, with its score.
    ///
    /// `None` when the index is empty or `point` lies outside the region.
    pub fn nearest_with_score(&self, point: &P) -> Option<(AgentId, f64)> {
        if !self.root.region.contains(point) {
            return None;
        }
        let mut best = None;
        self.root.nearest_into(point, self.extension, &mut best);
        best.map(|(score, agent)| (agent, score))
    }

    pub fn nearest(&self, point: &P) -> Option<AgentId> {
        self.nearest_with_score(point).map(|(agent, _)| agent)
    }

    /// The agent whose sphere contains `point`; the smallest power distance
    /// wins when spheres overlap.
    pub fn locate(&self, point: &P) -> Option<AgentId> {
        self.root.locate(point)
    }

    /// Agents whose spheres touch the sphere of `agent`, excluding itself.
    pub fn neighbours(&self, agent: AgentId) -> Vec<AgentId> {
        let Some(site) = self.sites.get(&agent) else {
            return Vec::new();
        };
        let mut found = BTreeMap::new();
        let area = Bounds::around(&site.center, site.radius + self.extension);
        self.root.candidates(&area, self.extension, &mut found);
        found
            .into_values()
            .filter(|other| other.agent != agent && other.touches(site))
            .map(|other| other.agent)
            .collect()
    }

    /// Every indexed agent, each once.
    pub fn contained_agents(&self) -> BTreeSet<AgentId> {
        let mut out = BTreeSet::new();
        self.root.collect(&mut out);
        out
    }

    #[inline]
    pub fn contains_agent(&self, agent: AgentId) -> bool {
        self.sites.contains_key(&agent)
    }

    pub fn site(&self, agent: AgentId) -> Option<&Site<P>> {
        self.sites.get(&agent)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn region(&self) -> &Bounds<P> {
        &self.root.region
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn extension(&self) -> f64 {
        self.extension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Depth of the deepest bucket (0 for an unsplit tree).
    pub fn depth(&self) -> usize {
        self.root.max_depth()
    }

    /// Total number of buckets, inner ones included.
    pub fn bucket_count(&self) -> usize {
        self.root.count()
    }
}
