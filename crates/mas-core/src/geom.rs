//! Small geometric and display value types shared by every crate.

// ── Location ──────────────────────────────────────────────────────────────────

/// Where a spatial agent sits: its center and the radius of its extent.
///
/// Two-dimensional users leave `center[2]` at zero.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub center: [f64; 3],
    pub radius: f64,
}

impl Location {
    pub fn new(center: [f64; 3], radius: f64) -> Self {
        Self { center, radius }
    }

    /// A point-like location (zero radius).
    pub fn point(center: [f64; 3]) -> Self {
        Self { center, radius: 0.0 }
    }

    /// Squared euclidean distance between two 3-D points.
    #[inline]
    pub fn distance_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
        let dx = a[0] - b[0];
        let dy = a[1] - b[1];
        let dz = a[2] - b[2];
        dx * dx + dy * dy + dz * dz
    }

    /// `true` if `point` lies inside (or on) this location's sphere.
    #[inline]
    pub fn contains(&self, point: [f64; 3]) -> bool {
        Self::distance_sq(self.center, point) <= self.radius * self.radius
    }
}

// ── Color ─────────────────────────────────────────────────────────────────────

/// RGB display color, each channel in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}
