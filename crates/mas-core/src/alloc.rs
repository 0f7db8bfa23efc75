//! Identifier allocation with deferred recycling.
//!
//! # Policy
//!
//! Identifiers are handed out from a monotonically increasing counter that
//! starts at 1.  Released identifiers are parked in an ordered set and are
//! only drawn again once the counter has reached `u64::MAX`; they then come
//! back smallest first.  When both sources are empty the allocator returns
//! the reserved value `0`.
//!
//! The allocators themselves are plain `&mut self` structures.  Sharing goes
//! through [`SharedIds`], which serialises access behind a mutex, and agent
//! identifiers are held as [`IdLease`]s that give the value back on drop.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{AgentId, MessageSink, Severity};

const SOURCE: &str = "IdAllocator";

// ── IdAllocator ───────────────────────────────────────────────────────────────

/// One counter + released-pool pair.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    /// Last identifier handed out from the counter (`0` before the first one).
    current: u64,
    /// Identifiers returned by their owners, reused only after exhaustion.
    released: BTreeSet<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose counter has already handed out every value up to
    /// `current`.  Mostly useful to exercise the exhaustion path.
    pub fn with_start(current: u64) -> Self {
        Self { current, released: BTreeSet::new() }
    }

    /// Next unused identifier, or `0` if the counter is exhausted and nothing
    /// was released.
    pub fn allocate(&mut self) -> u64 {
        if self.current < u64::MAX {
            self.current += 1;
            return self.current;
        }
        self.released.pop_first().unwrap_or(0)
    }

    /// Return `id` to the pool.  Releasing `0` is ignored.
    ///
    /// Releasing an identifier that is still in use is a caller bug; it is
    /// caught in debug builds when the value was never handed out.
    pub fn release(&mut self, id: u64) {
        if id == 0 {
            return;
        }
        debug_assert!(id <= self.current, "releasing id {id} that was never allocated");
        self.released.insert(id);
    }

    /// `true` once the monotonic counter can no longer advance.
    pub fn is_exhausted(&self) -> bool {
        self.current == u64::MAX
    }

    /// Number of identifiers waiting in the released pool.
    pub fn released_count(&self) -> usize {
        self.released.len()
    }
}

// ── IdRegistry ────────────────────────────────────────────────────────────────

/// The agent allocator plus any number of independent named allocators.
///
/// Named allocators are created lazily on first use, so different entity
/// categories (`"spatial-index"`, `"thread-group"`, …) never collide.
#[derive(Debug, Default)]
pub struct IdRegistry {
    agents: IdAllocator,
    named:  HashMap<String, IdAllocator>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose agent allocator starts from `agents` (see
    /// [`IdAllocator::with_start`]).
    pub fn with_agent_allocator(agents: IdAllocator) -> Self {
        Self { agents, named: HashMap::new() }
    }

    /// Next agent identifier, [`AgentId::UNASSIGNED`] on exhaustion.
    pub fn allocate_agent(&mut self) -> AgentId {
        AgentId(self.agents.allocate())
    }

    pub fn release_agent(&mut self, id: AgentId) {
        self.agents.release(id.0);
    }

    /// Next identifier from the allocator called `name`, `0` on exhaustion.
    pub fn allocate_for(&mut self, name: &str) -> u64 {
        self.named_mut(name).allocate()
    }

    pub fn release_for(&mut self, name: &str, id: u64) {
        self.named_mut(name).release(id);
    }

    /// Number of named allocators created so far.
    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    /// Drop every counter and pool, agent and named alike.
    pub fn reset(&mut self) {
        self.agents = IdAllocator::new();
        self.named.clear();
    }

    fn named_mut(&mut self, name: &str) -> &mut IdAllocator {
        self.named.entry(name.to_owned()).or_default()
    }
}

// ── SharedIds ─────────────────────────────────────────────────────────────────

/// Cloneable handle to one [`IdRegistry`] shared by a simulation run.
#[derive(Clone, Default)]
pub struct SharedIds(Arc<Mutex<IdRegistry>>);

impl SharedIds {
    pub fn new(registry: IdRegistry) -> Self {
        Self(Arc::new(Mutex::new(registry)))
    }

    /// Lock the registry.  A poisoned lock is recovered: the registry holds
    /// plain counters that stay consistent across a panicking holder.
    pub fn lock(&self) -> MutexGuard<'_, IdRegistry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an agent identifier wrapped in a lease.
    ///
    /// On exhaustion a "cannot process" message is sent to `sink` and the
    /// lease carries [`AgentId::UNASSIGNED`].
    pub fn lease_agent(&self, sink: &dyn MessageSink) -> IdLease {
        let id = self.lock().allocate_agent();
        if !id.is_assigned() {
            sink.message(Severity::CannotProcess, "no more available ID", SOURCE);
        }
        IdLease { id, owner: self.clone() }
    }

    /// Allocate from the named allocator `name`, logging on exhaustion.
    pub fn allocate_for(&self, name: &str, sink: &dyn MessageSink) -> u64 {
        let id = self.lock().allocate_for(name);
        if id == 0 {
            sink.message(
                Severity::CannotProcess,
                &format!("no more available ID for {name}"),
                SOURCE,
            );
        }
        id
    }

    pub fn release_for(&self, name: &str, id: u64) {
        self.lock().release_for(name, id);
    }
}

impl fmt::Debug for SharedIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedIds").finish_non_exhaustive()
    }
}

// ── IdLease ───────────────────────────────────────────────────────────────────

/// An agent identifier that returns itself to its registry when dropped.
pub struct IdLease {
    id:    AgentId,
    owner: SharedIds,
}

impl IdLease {
    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }
}

impl Drop for IdLease {
    fn drop(&mut self) {
        if self.id.is_assigned() {
            self.owner.lock().release_agent(self.id);
        }
    }
}

impl fmt::Debug for IdLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdLease({})", self.id)
    }
}
