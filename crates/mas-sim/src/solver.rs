//! Conflict solvers: run once per step, after every group has joined and
//! before spatial indices are refreshed.

use std::collections::HashSet;

use mas_agent::AgentStore;
use mas_core::AgentId;

/// Attempts made by [`SpatialConflictSolver`] to pull a move back before
/// giving up on it.
pub const MAX_SOLVE_ITERATIONS: u32 = 100;

pub trait ConflictSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Adjust the pending moves of `agents`.
    ///
    /// `threshold` is the configured displacement threshold; solvers are only
    /// invoked when it is non-negative.  Returns `false` if some conflict was
    /// left unsolved.
    fn solve(&self, store: &mut AgentStore, agents: &[AgentId], threshold: f64) -> bool;
}

// ── SpatialConflictSolver ─────────────────────────────────────────────────────

/// Forbids two dynamic agents from ending a step on the same position.
///
/// Agents that do not move keep their position.  Movers are served in id
/// order: a mover whose target is taken is pulled back along its journey,
/// halving the travelled fraction each attempt.  A mover still blocked after
/// [`MAX_SOLVE_ITERATIONS`] attempts stays where it is and the solve fails.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpatialConflictSolver;

impl SpatialConflictSolver {
    pub fn new() -> Self {
        Self
    }
}

/// Bitwise key so that positions compare exactly; `-0.0` folds onto `0.0`.
fn key(p: [f64; 3]) -> [u64; 3] {
    p.map(|x| (x + 0.0).to_bits())
}

fn along(origin: [f64; 3], target: [f64; 3], ratio: f64) -> [f64; 3] {
    [
        origin[0] + (target[0] - origin[0]) * ratio,
        origin[1] + (target[1] - origin[1]) * ratio,
        origin[2] + (target[2] - origin[2]) * ratio,
    ]
}

impl ConflictSolver for SpatialConflictSolver {
    fn name(&self) -> &str {
        "SpatialConflictSolver"
    }

    fn solve(&self, store: &mut AgentStore, agents: &[AgentId], _threshold: f64) -> bool {
        let mut claimed: HashSet<[u64; 3]> = HashSet::new();
        let mut movers = Vec::new();

        for &id in agents {
            if !store.is_dynamic(id) {
                continue;
            }
            let Some(motion) = store.get(id).and_then(|a| a.motion()) else { continue };
            match motion.requested() {
                None    => { claimed.insert(key(motion.position())); }
                Some(_) => movers.push(id),
            }
        }

        let mut solved = true;
        for id in movers {
            let Some(motion) = store.get_mut(id).and_then(|a| a.motion_mut()) else { continue };
            let origin = motion.position();
            let Some(target) = motion.requested() else { continue };

            let mut candidate = target;
            let mut ratio = 1.0;
            let mut attempts = 0;
            while claimed.contains(&key(candidate)) && attempts < MAX_SOLVE_ITERATIONS {
                ratio /= 2.0;
                attempts += 1;
                candidate = along(origin, target, ratio);
            }

            if claimed.contains(&key(candidate)) {
                motion.cancel_request();
                claimed.insert(key(origin));
                solved = false;
                continue;
            }
            claimed.insert(key(candidate));
            if candidate != target {
                motion.request(candidate);
            }
        }
        solved
    }
}
