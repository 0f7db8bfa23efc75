//! Per-step agent sampling strategies.
//!
//! When a run is limited to `n` agents per step, the manager asks an
//! [`AgentSampler`] which agents execute.  Both strategies sample without
//! replacement; they differ only in how they treat the agents that ran on
//! the previous step.

use std::collections::BTreeSet;

use mas_core::{AgentId, SimRng};

pub trait AgentSampler: Send {
    /// Pick `n` distinct agents of `working`.
    ///
    /// `last` is the set executed on the previous step.  When `n` is at
    /// least `working.len()` every agent is returned.
    fn sample(
        &mut self,
        working: &BTreeSet<AgentId>,
        n:       usize,
        last:    &BTreeSet<AgentId>,
        rng:     &mut SimRng,
    ) -> BTreeSet<AgentId>;
}

/// Draw `n` distinct entries of `pool` by rejection.
fn draw(pool: &[AgentId], n: usize, rng: &mut SimRng) -> BTreeSet<AgentId> {
    if n >= pool.len() {
        return pool.iter().copied().collect();
    }
    let mut picked = BTreeSet::new();
    while picked.len() < n {
        picked.insert(pool[rng.index(pool.len())]);
    }
    picked
}

// ── UniformSampler ────────────────────────────────────────────────────────────

/// Uniform sampling; the previous step is ignored.
#[derive(Copy, Clone, Debug, Default)]
pub struct UniformSampler;

impl AgentSampler for UniformSampler {
    fn sample(
        &mut self,
        working: &BTreeSet<AgentId>,
        n:       usize,
        _last:   &BTreeSet<AgentId>,
        rng:     &mut SimRng,
    ) -> BTreeSet<AgentId> {
        let pool: Vec<AgentId> = working.iter().copied().collect();
        draw(&pool, n, rng)
    }
}

// ── FairSampler ───────────────────────────────────────────────────────────────

/// Agents that did not run last step go first; the remainder is drawn
/// uniformly among those that did.
///
/// With `n <= working.len() / 2` no agent runs two steps in a row.
#[derive(Copy, Clone, Debug, Default)]
pub struct FairSampler;

impl AgentSampler for FairSampler {
    fn sample(
        &mut self,
        working: &BTreeSet<AgentId>,
        n:       usize,
        last:    &BTreeSet<AgentId>,
        rng:     &mut SimRng,
    ) -> BTreeSet<AgentId> {
        let (rested, ran): (Vec<AgentId>, Vec<AgentId>) =
            working.iter().copied().partition(|id| !last.contains(id));

        if n <= rested.len() {
            return draw(&rested, n, rng);
        }
        let mut picked = draw(&ran, n - rested.len(), rng);
        picked.extend(rested);
        picked
    }
}
