//! Per-bucket nearest-site strategies.
//!
//! A leaf bucket answers "which of my sites is nearest to this point" through
//! a [`LeafIndex`].  Auxiliary structures are built once per bucket, after
//! all insertions, in [`LeafIndex::build`].
//!
//! | Strategy         | Metric                    | Auxiliary structure        |
//! |------------------|---------------------------|----------------------------|
//! | [`CenterScan`]   | `|p - c|²`                | none (linear scan)         |
//! | [`PowerLocator`] | `|p - c|² - r²`           | `rstar` R-tree             |

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::geometry::{SpacePoint, distance_sq};
use crate::Site;

// ── LeafIndex ─────────────────────────────────────────────────────────────────

pub trait LeafIndex<P: SpacePoint>: Default + Send + Sync {
    /// Value minimised by nearest-site queries.
    fn score(site: &Site<P>, point: &P) -> f64;

    /// Smallest score any site of a bucket can reach, given the squared
    /// distance from the query to the bucket's extended region and the
    /// tree's extension length (the largest site radius).
    fn lower_bound(box_distance_sq: f64, extension: f64) -> f64;

    /// Prepare for queries over exactly `sites`.
    fn build(&mut self, _sites: &[Site<P>]) {}

    fn clear(&mut self) {}

    /// Position in `sites` of the best site and its score.
    fn nearest(&self, sites: &[Site<P>], point: &P) -> Option<(usize, f64)> {
        scan::<P, Self>(sites, point)
    }
}

fn scan<P: SpacePoint, L: LeafIndex<P>>(sites: &[Site<P>], point: &P) -> Option<(usize, f64)> {
    sites
        .iter()
        .enumerate()
        .map(|(i, s)| (i, L::score(s, point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

// ── CenterScan ────────────────────────────────────────────────────────────────

/// Nearest by center distance over the bucket's sites.
#[derive(Copy, Clone, Debug, Default)]
pub struct CenterScan;

impl<P: SpacePoint> LeafIndex<P> for CenterScan {
    #[inline]
    fn score(site: &Site<P>, point: &P) -> f64 {
        distance_sq(&site.center, point)
    }

    #[inline]
    fn lower_bound(box_distance_sq: f64, _extension: f64) -> f64 {
        box_distance_sq
    }
}

// ── PowerLocator ──────────────────────────────────────────────────────────────

/// Nearest by power distance, for spheroidal cells.
///
/// A point belongs to the cell minimising `|p - c|² - r²`, which is what a
/// weighted Delaunay triangulation's nearest power vertex returns.  The
/// bucket's sites are bulk-loaded into an R-tree whose entries report that
/// distance shifted by the bucket's largest `r²`, keeping it non-negative and
/// never below the entry's envelope distance.
#[derive(Debug)]
pub struct PowerLocator<P: SpacePoint> {
    tree:  RTree<PowerEntry<P>>,
    shift: f64,
}

impl<P: SpacePoint> Default for PowerLocator<P> {
    fn default() -> Self {
        Self { tree: RTree::new(), shift: 0.0 }
    }
}

impl<P: SpacePoint> PowerLocator<P> {
    /// Number of sites the locator was built over.
    pub fn size(&self) -> usize {
        self.tree.size()
    }
}

impl<P: SpacePoint> LeafIndex<P> for PowerLocator<P> {
    #[inline]
    fn score(site: &Site<P>, point: &P) -> f64 {
        site.power_distance(point)
    }

    #[inline]
    fn lower_bound(box_distance_sq: f64, extension: f64) -> f64 {
        box_distance_sq - extension * extension
    }

    fn build(&mut self, sites: &[Site<P>]) {
        self.shift = sites.iter().map(|s| s.radius * s.radius).fold(0.0, f64::max);
        let entries = sites
            .iter()
            .enumerate()
            .map(|(slot, s)| PowerEntry {
                slot,
                center: s.center,
                radius: s.radius,
                shift: self.shift,
            })
            .collect();
        self.tree = RTree::bulk_load(entries);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn nearest(&self, sites: &[Site<P>], point: &P) -> Option<(usize, f64)> {
        if self.tree.size() != sites.len() {
            // Not built over these sites yet.
            return scan::<P, Self>(sites, point);
        }
        // Best-first iteration only relies on envelope distances being lower
        // bounds, which the shifted metric guarantees.
        self.tree
            .nearest_neighbor_iter(point)
            .next()
            .map(|e| (e.slot, distance_sq(&e.center, point) - e.radius * e.radius))
    }
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct PowerEntry<P> {
    slot:   usize,
    center: P,
    radius: f64,
    shift:  f64,
}

impl<P: SpacePoint> RTreeObject for PowerEntry<P> {
    type Envelope = AABB<P>;

    /// The sphere's bounding box.
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            P::generate(|d| self.center.nth(d) - self.radius),
            P::generate(|d| self.center.nth(d) + self.radius),
        )
    }
}

impl<P: SpacePoint> PointDistance for PowerEntry<P> {
    fn distance_2(&self, point: &P) -> f64 {
        (distance_sq(&self.center, point) - self.radius * self.radius + self.shift).max(0.0)
    }

    fn contains_point(&self, point: &P) -> bool {
        distance_sq(&self.center, point) <= self.radius * self.radius
    }
}
