//! The physical body an agent owns.

/// Opaque resource exclusively owned by one agent and dropped with it.
///
/// Every method has a default so application bodies only override what they
/// model.
pub trait Body: Send {
    /// Whether other bodies may pass through this one.
    fn is_crossable(&self) -> bool {
        false
    }

    /// Whether the body changes shape under load.
    fn is_deformable(&self) -> bool {
        false
    }

    fn weight(&self) -> f64 {
        0.0
    }

    /// Rendering hook; the core never draws.
    fn draw(&self) {}
}

/// A body with fixed attributes and no behaviour.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InertBody {
    pub crossable:  bool,
    pub deformable: bool,
    pub weight:     f64,
}

impl InertBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn crossable(mut self, yes: bool) -> Self {
        self.crossable = yes;
        self
    }

    pub fn deformable(mut self, yes: bool) -> Self {
        self.deformable = yes;
        self
    }
}

impl Body for InertBody {
    fn is_crossable(&self) -> bool {
        self.crossable
    }

    fn is_deformable(&self) -> bool {
        self.deformable
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}
