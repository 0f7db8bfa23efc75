//! Simulation-level RNG wrapper.
//!
//! One `SimRng` per simulation run, seeded from `MasConfig::seed`.  It is only
//! touched by the orchestrator between parallel sections (agent sampling), so
//! it needs no synchronisation.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Deterministic RNG for orchestrator-side decisions.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Uniform index in `0..len`.
    ///
    /// # Panics
    /// Panics if `len == 0`.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

impl std::fmt::Debug for SimRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SimRng")
    }
}
