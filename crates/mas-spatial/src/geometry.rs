//! Points, axis-aligned regions and indexed sites.
//!
//! Everything is generic over the dimension through `rstar::Point`, so the
//! same code serves 2-D (`[f64; 2]`) and 3-D (`[f64; 3]`) trees.

use rstar::Point;

use mas_core::{AgentId, Location};

// ── SpacePoint ────────────────────────────────────────────────────────────────

/// A point type usable by the spatial index.
///
/// Agents report 3-D locations; 2-D trees drop the `z` coordinate.
pub trait SpacePoint: Point<Scalar = f64> + Copy + Send + Sync {
    fn from_xyz(xyz: [f64; 3]) -> Self;
    fn to_xyz(&self) -> [f64; 3];
}

impl SpacePoint for [f64; 3] {
    #[inline]
    fn from_xyz(xyz: [f64; 3]) -> Self {
        xyz
    }

    #[inline]
    fn to_xyz(&self) -> [f64; 3] {
        *self
    }
}

impl SpacePoint for [f64; 2] {
    #[inline]
    fn from_xyz(xyz: [f64; 3]) -> Self {
        [xyz[0], xyz[1]]
    }

    #[inline]
    fn to_xyz(&self) -> [f64; 3] {
        [self[0], self[1], 0.0]
    }
}

/// Squared euclidean distance.
#[inline]
pub fn distance_sq<P: SpacePoint>(a: &P, b: &P) -> f64 {
    (0..P::DIMENSIONS)
        .map(|d| {
            let x = a.nth(d) - b.nth(d);
            x * x
        })
        .sum()
}

// ── Bounds ────────────────────────────────────────────────────────────────────

/// Closed axis-aligned box `[min, max]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds<P> {
    min: P,
    max: P,
}

impl<P: SpacePoint> Bounds<P> {
    pub fn new(min: P, max: P) -> Self {
        Self { min, max }
    }

    /// Cube of half-side `half` centred on `center`.
    pub fn around(center: &P, half: f64) -> Self {
        Self {
            min: P::generate(|d| center.nth(d) - half),
            max: P::generate(|d| center.nth(d) + half),
        }
    }

    #[inline]
    pub fn min(&self) -> &P {
        &self.min
    }

    #[inline]
    pub fn max(&self) -> &P {
        &self.max
    }

    /// First axis on which `min > max`, if any.
    pub fn inverted_axis(&self) -> Option<usize> {
        (0..P::DIMENSIONS).find(|&d| !(self.min.nth(d) <= self.max.nth(d)))
    }

    /// Inclusive on every face.
    pub fn contains(&self, p: &P) -> bool {
        (0..P::DIMENSIONS).all(|d| {
            let x = p.nth(d);
            x >= self.min.nth(d) && x <= self.max.nth(d)
        })
    }

    pub fn intersects(&self, other: &Bounds<P>) -> bool {
        (0..P::DIMENSIONS)
            .all(|d| self.min.nth(d) <= other.max.nth(d) && other.min.nth(d) <= self.max.nth(d))
    }

    /// This box pushed outwards by `by` on every face.
    pub fn grown(&self, by: f64) -> Self {
        Self {
            min: P::generate(|d| self.min.nth(d) - by),
            max: P::generate(|d| self.max.nth(d) + by),
        }
    }

    pub fn center(&self) -> P {
        P::generate(|d| (self.min.nth(d) + self.max.nth(d)) / 2.0)
    }

    /// The `i`-th of the `2^D` equal sub-boxes.  Bit `d` of `i` selects the
    /// upper half along axis `d`.
    pub fn orthant(&self, i: usize) -> Self {
        let mid = self.center();
        Self {
            min: P::generate(|d| if (i >> d) & 1 == 1 { mid.nth(d) } else { self.min.nth(d) }),
            max: P::generate(|d| if (i >> d) & 1 == 1 { self.max.nth(d) } else { mid.nth(d) }),
        }
    }

    /// Squared distance from `p` to the box; zero inside.
    pub fn distance_sq(&self, p: &P) -> f64 {
        (0..P::DIMENSIONS)
            .map(|d| {
                let x = p.nth(d);
                let gap = (self.min.nth(d) - x).max(x - self.max.nth(d)).max(0.0);
                gap * gap
            })
            .sum()
    }
}

// ── Site ──────────────────────────────────────────────────────────────────────

/// An agent as the index sees it: identifier, center and radius.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Site<P> {
    pub agent:  AgentId,
    pub center: P,
    pub radius: f64,
}

impl<P: SpacePoint> Site<P> {
    pub fn new(agent: AgentId, center: P, radius: f64) -> Self {
        Self { agent, center, radius: radius.max(0.0) }
    }

    pub fn from_location(agent: AgentId, loc: &Location) -> Self {
        Self::new(agent, P::from_xyz(loc.center), loc.radius)
    }

    /// `|p - c|² - r²`: negative inside the sphere, zero on it.
    #[inline]
    pub fn power_distance(&self, p: &P) -> f64 {
        distance_sq(&self.center, p) - self.radius * self.radius
    }

    #[inline]
    pub fn contains(&self, p: &P) -> bool {
        self.power_distance(p) <= 0.0
    }

    /// `true` if the two spheres touch or overlap.
    pub fn touches(&self, other: &Site<P>) -> bool {
        let reach = self.radius + other.radius;
        distance_sq(&self.center, &other.center) <= reach * reach
    }
}
