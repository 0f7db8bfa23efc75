//! The simulation manager: assigns agents to thread groups and drives one
//! step of the simulation.
//!
//! # One step
//!
//! ```text
//! (a) tag        — flag every managed agent, or a sample of them, for execution
//! (b) run        — every ThreadAgentGroup runs on the rayon pool
//! (c) join       — the pool scope returns once every group has finished
//! (d) solve      — forces become requested moves; solvers adjudicate them
//!     commit     — surviving requests become positions
//! (e) refresh    — every spatial index under the top layer is rebuilt
//! ```
//!
//! Only (b) runs concurrently.  Group membership is exclusive, so each group
//! gets its own disjoint `&mut` batch of agents and no locking is needed.

use std::collections::{BTreeMap, BTreeSet};

use mas_agent::{AgentStore, StepContext};
use mas_core::{AgentId, MasConfig, MasContext, Severity, SimRng, ThreadId};
use mas_layer::{LayerPath, World};
use mas_spatial::IndexRegistry;
use rayon::ThreadPool;

use crate::{AgentSampler, ConflictSolver, SimError, SimResult, ThreadAgentGroup, UniformSampler};

/// Name of the allocator thread group ids are drawn from.
pub const THREAD_ALLOCATOR: &str = "thread-group";

const SOURCE: &str = "SimulationManager";

#[cfg(feature = "fx-hash")]
type AgentGroupMap = rustc_hash::FxHashMap<AgentId, ThreadId>;
#[cfg(not(feature = "fx-hash"))]
type AgentGroupMap = std::collections::HashMap<AgentId, ThreadId>;

// ── StepReport ────────────────────────────────────────────────────────────────

/// What happened during one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    /// 0-based index of the step within the manager's lifetime.
    pub step:              u64,
    /// Simulated time at the end of the step.
    pub time:              f64,
    /// Simulated time consumed by the step.
    pub duration:          f64,
    /// Agents flagged for execution.
    pub executed:          usize,
    /// Groups whose `run` did not succeed.
    pub failed_groups:     Vec<ThreadId>,
    /// `false` if a conflict solver left a conflict unsolved.
    pub conflicts_solved:  bool,
    /// Agents whose requested move was committed.
    pub moved:             usize,
    /// Spatial indices rebuilt after the step.
    pub refreshed_indices: usize,
}

impl StepReport {
    /// No failed group and no unsolved conflict.
    pub fn is_clean(&self) -> bool {
        self.failed_groups.is_empty() && self.conflicts_solved
    }
}

// ── SimulationManager ─────────────────────────────────────────────────────────

pub struct SimulationManager {
    ctx:               MasContext,
    groups:            BTreeMap<ThreadId, ThreadAgentGroup>,
    agent_group:       AgentGroupMap,
    agents:            BTreeSet<AgentId>,
    max_thread_groups: usize,
    solvers:           Vec<Box<dyn ConflictSolver>>,
    top_layer:         Option<LayerPath>,
    threshold:         f64,
    agents_per_step:   Option<usize>,
    last_executed:     BTreeSet<AgentId>,
    sampler:           Box<dyn AgentSampler>,
    rng:               SimRng,
    pool:              ThreadPool,
    steps:             u64,
}

fn build_pool(workers: usize) -> SimResult<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("mas-group-{i}"))
        .build()
        .map_err(|e| SimError::Pool(e.to_string()))
}

impl SimulationManager {
    /// Create a manager configured from `config`, with a worker pool of
    /// `config.max_thread_groups` threads and no top layer.
    pub fn new(ctx: MasContext, config: &MasConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            ctx,
            groups:            BTreeMap::new(),
            agent_group:       AgentGroupMap::default(),
            agents:            BTreeSet::new(),
            max_thread_groups: config.max_thread_groups,
            solvers:           Vec::new(),
            top_layer:         None,
            threshold:         config.displacement_threshold,
            agents_per_step:   config.agents_per_step,
            last_executed:     BTreeSet::new(),
            sampler:           Box::new(UniformSampler),
            rng:               SimRng::new(config.seed),
            pool:              build_pool(config.max_thread_groups)?,
            steps:             0,
        })
    }

    // ── Configuration ─────────────────────────────────────────────────────

    pub fn top_layer(&self) -> Option<&LayerPath> {
        self.top_layer.as_ref()
    }

    pub fn set_top_layer(&mut self, path: LayerPath) {
        self.top_layer = Some(path);
    }

    pub fn max_thread_groups(&self) -> usize {
        self.max_thread_groups
    }

    /// Change the group limit and rebuild the worker pool.  Existing groups
    /// are kept even when they exceed the new limit.
    pub fn set_max_thread_groups(&mut self, max: usize) -> SimResult<()> {
        if max == 0 {
            return Err(SimError::Pool("at least one thread group is required".into()));
        }
        self.pool = build_pool(max)?;
        self.max_thread_groups = max;
        Ok(())
    }

    pub fn displacement_threshold(&self) -> f64 {
        self.threshold
    }

    /// Negative disables clamping and conflict solving.
    pub fn set_displacement_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn agents_per_step(&self) -> Option<usize> {
        self.agents_per_step
    }

    /// `None` executes every agent.
    pub fn set_agents_per_step(&mut self, n: Option<usize>) {
        self.agents_per_step = n;
    }

    pub fn set_sampler(&mut self, sampler: Box<dyn AgentSampler>) {
        self.sampler = sampler;
    }

    /// Solvers run in registration order.
    pub fn add_conflict_solver(&mut self, solver: Box<dyn ConflictSolver>) {
        self.solvers.push(solver);
    }

    /// Unregister the first solver called `name` and hand it back.
    pub fn remove_conflict_solver(&mut self, name: &str) -> Option<Box<dyn ConflictSolver>> {
        let pos = self.solvers.iter().position(|s| s.name() == name)?;
        Some(self.solvers.remove(pos))
    }

    pub fn solver_count(&self) -> usize {
        self.solvers.len()
    }

    // ── Membership ────────────────────────────────────────────────────────

    /// Rebuild every group from the top layer's working set.
    ///
    /// Returns the number of managed agents.
    pub fn init(&mut self, world: &World) -> SimResult<usize> {
        let top = self.top_layer.as_ref().ok_or(SimError::NoTopLayer)?;
        let layer = world.layer(top).ok_or(SimError::NoTopLayer)?;
        let working: Vec<AgentId> = layer
            .get_unique_agents_and_sub_agents()
            .into_iter()
            .filter(|id| world.store().contains(*id))
            .collect();
        if working.is_empty() {
            return Err(SimError::NoAgents);
        }

        self.clear_groups();
        for id in working {
            self.add_agent(id)?;
        }
        self.ctx.message(
            Severity::Info,
            &format!("{} agents spread over {} thread groups", self.agents.len(), self.groups.len()),
            SOURCE,
        );
        Ok(self.agents.len())
    }

    /// Track `id` in a thread group.  Already tracked agents stay where they
    /// are.
    pub fn add_agent(&mut self, id: AgentId) -> SimResult<()> {
        if !id.is_assigned() {
            return Err(SimError::InvalidAgent);
        }
        if self.agent_group.contains_key(&id) {
            return Ok(());
        }
        let tid = self.find_thread_to_add_agent().ok_or(SimError::NoThreadAvailable(id))?;
        let group = self.groups.get_mut(&tid).ok_or(SimError::NoThreadAvailable(id))?;
        group.add_agent(id)?;
        self.agent_group.insert(id, tid);
        self.agents.insert(id);
        Ok(())
    }

    /// Stop tracking `id`.  Returns `false` if it was not tracked.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        let Some(tid) = self.agent_group.remove(&id) else { return false };
        if let Some(group) = self.groups.get_mut(&tid) {
            group.remove_agent(id);
        }
        self.agents.remove(&id);
        self.last_executed.remove(&id);
        true
    }

    /// Pick the group a new agent joins: an empty group if there is one,
    /// else a new group while under the limit, else the least loaded group.
    pub fn find_thread_to_add_agent(&mut self) -> Option<ThreadId> {
        if let Some((&tid, _)) = self.groups.iter().find(|(_, g)| g.is_empty()) {
            return Some(tid);
        }
        if self.groups.len() < self.max_thread_groups {
            let raw = self.ctx.ids().allocate_for(THREAD_ALLOCATOR, self.ctx.sink());
            if let Some(tid) = ThreadId::try_from(raw).ok().filter(|t| t.is_assigned()) {
                self.groups.insert(tid, ThreadAgentGroup::new(tid));
                return Some(tid);
            }
        }
        self.groups.values().min_by_key(|g| g.len()).map(ThreadAgentGroup::id)
    }

    /// Bring membership in line with the top layer: agents that left it (or
    /// were destroyed) are dropped, newcomers are added.
    pub fn sync_with(&mut self, world: &World) -> SimResult<()> {
        let Some(layer) = self.top_layer.as_ref().and_then(|top| world.layer(top)) else {
            return Err(SimError::NoTopLayer);
        };
        let current: BTreeSet<AgentId> = layer
            .get_unique_agents_and_sub_agents()
            .into_iter()
            .filter(|id| world.store().contains(*id))
            .collect();

        let gone: Vec<AgentId> = self.agents.difference(&current).copied().collect();
        for id in gone {
            self.remove_agent(id);
        }
        for id in current {
            self.add_agent(id)?;
        }
        Ok(())
    }

    pub fn group(&self, tid: ThreadId) -> Option<&ThreadAgentGroup> {
        self.groups.get(&tid)
    }

    pub fn groups(&self) -> impl Iterator<Item = &ThreadAgentGroup> + '_ {
        self.groups.values()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_of(&self, id: AgentId) -> Option<ThreadId> {
        self.agent_group.get(&id).copied()
    }

    pub fn agents(&self) -> &BTreeSet<AgentId> {
        &self.agents
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Agents executed on the last step.
    pub fn last_executed(&self) -> &BTreeSet<AgentId> {
        &self.last_executed
    }

    pub fn steps_run(&self) -> u64 {
        self.steps
    }

    // ── Step ──────────────────────────────────────────────────────────────

    /// Run one step over `world` and refresh the indices under the top layer.
    pub fn run_one_step(
        &mut self,
        world:   &mut World,
        indices: &mut IndexRegistry,
        step:    &StepContext,
    ) -> SimResult<StepReport> {
        if self.groups.is_empty() {
            return Err(SimError::NotInitialized);
        }
        let step = StepContext { displacement_threshold: self.threshold, ..*step };

        // (a)
        let selected = self.select_agents();
        for &id in &self.agents {
            if let Some(agent) = world.store_mut().get_mut(id) {
                agent.core_mut().set_to_be_executed(selected.contains(&id));
            }
        }

        // (b) + (c)
        self.run_groups(world.store_mut(), &step);
        let failed_groups: Vec<ThreadId> = self
            .groups
            .values()
            .filter(|g| !g.is_empty() && !g.has_succeeded())
            .map(ThreadAgentGroup::id)
            .collect();
        for tid in &failed_groups {
            self.ctx.message(Severity::Warning, &format!("{tid} did not succeed"), SOURCE);
        }

        // (d)
        let store = world.store_mut();
        for &id in &selected {
            if !store.is_dynamic(id) {
                continue;
            }
            if let Some(motion) = store.get_mut(id).and_then(|a| a.motion_mut()) {
                motion.request_from_force(self.threshold);
            }
        }
        let conflicts_solved = self.solve_conflicts(store);
        let moved = self.update_agent_state(store);

        // (e)
        let refreshed_indices = match &self.top_layer {
            Some(top) => indices.refresh_reachable(world, top),
            None      => 0,
        };

        let report = StepReport {
            step: self.steps,
            time: step.current_time,
            duration: step.step_duration,
            executed: selected.len(),
            failed_groups,
            conflicts_solved,
            moved,
            refreshed_indices,
        };
        self.last_executed = selected;
        self.steps += 1;
        Ok(report)
    }

    fn select_agents(&mut self) -> BTreeSet<AgentId> {
        match self.agents_per_step {
            Some(n) if n < self.agents.len() => {
                self.sampler.sample(&self.agents, n, &self.last_executed, &mut self.rng)
            }
            _ => self.agents.clone(),
        }
    }

    fn run_groups(&mut self, store: &mut AgentStore, step: &StepContext) {
        let assignment = &self.agent_group;
        let mut batches = store.partition_mut(|id| assignment.get(&id).copied());
        let sink = self.ctx.sink();
        let groups = &mut self.groups;

        // `scope` returns only after every spawned group has finished.
        self.pool.scope(|scope| {
            for (tid, group) in groups {
                group.set_step_duration(step.step_duration);
                let mut batch = batches.remove(tid).unwrap_or_default();
                scope.spawn(move |_| {
                    group.run(&mut batch, step, sink);
                });
            }
        });
    }

    /// Run every solver in order when the threshold is enabled.
    fn solve_conflicts(&self, store: &mut AgentStore) -> bool {
        if self.threshold < 0.0 {
            return true;
        }
        let agents: Vec<AgentId> = self.agents.iter().copied().collect();
        let mut solved = true;
        for solver in &self.solvers {
            if !solver.solve(store, &agents, self.threshold) {
                self.ctx.message(
                    Severity::CannotProcess,
                    &format!("{} left conflicts unsolved", solver.name()),
                    SOURCE,
                );
                solved = false;
            }
        }
        solved
    }

    /// Commit the surviving move requests of dynamic agents.
    fn update_agent_state(&self, store: &mut AgentStore) -> usize {
        let mut moved = 0;
        for &id in &self.agents {
            if !store.is_dynamic(id) {
                continue;
            }
            if store.get_mut(id).and_then(|a| a.motion_mut()).is_some_and(|m| m.commit()) {
                moved += 1;
            }
        }
        moved
    }

    // ── Shutdown ──────────────────────────────────────────────────────────

    /// Stop every managed agent; membership is kept.
    pub fn stop(&self, store: &mut AgentStore) {
        for group in self.groups.values() {
            group.stop(store);
        }
    }

    /// Drop every group and release their ids.
    pub fn reset(&mut self) {
        self.clear_groups();
        self.steps = 0;
    }

    fn clear_groups(&mut self) {
        for (tid, mut group) in std::mem::take(&mut self.groups) {
            group.reset();
            self.ctx.ids().release_for(THREAD_ALLOCATOR, tid.raw());
        }
        self.agent_group.clear();
        self.agents.clear();
        self.last_executed.clear();
    }
}

impl Drop for SimulationManager {
    fn drop(&mut self) {
        self.clear_groups();
    }
}

impl std::fmt::Debug for SimulationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationManager")
            .field("groups", &self.groups.len())
            .field("agents", &self.agents.len())
            .field("max_thread_groups", &self.max_thread_groups)
            .field("top_layer", &self.top_layer)
            .field("threshold", &self.threshold)
            .field("agents_per_step", &self.agents_per_step)
            .field("steps", &self.steps)
            .finish()
    }
}
