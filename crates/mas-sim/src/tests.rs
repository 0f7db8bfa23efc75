//! Unit tests for mas-sim.

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use mas_agent::{Agent, AgentCore, AgentError, AgentResult, InertBody, Motion, StepContext};
    use mas_core::{AgentId, Location, MasConfig, MasContext};
    use mas_layer::{Layer, LayerPath, World};

    pub type Log = Arc<Mutex<Vec<(AgentId, &'static str)>>>;

    /// Records every lifecycle hook it goes through.
    pub struct Tracer {
        core:      AgentCore,
        log:       Log,
        fail_exec: bool,
    }

    impl Tracer {
        fn record(&self, hook: &'static str) {
            self.log.lock().unwrap().push((self.core.id(), hook));
        }
    }

    impl Agent for Tracer {
        fn core(&self) -> &AgentCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut AgentCore {
            &mut self.core
        }
        fn init(&mut self, _ctx: &StepContext) -> AgentResult {
            self.record("init");
            Ok(())
        }
        fn start(&mut self, _ctx: &StepContext) -> AgentResult {
            self.record("start");
            Ok(())
        }
        fn exec(&mut self, _ctx: &StepContext) -> AgentResult {
            self.record("exec");
            if self.fail_exec {
                return Err(AgentError::Hook { agent: self.core.id(), reason: "boom".into() });
            }
            Ok(())
        }
    }

    pub fn tracer(ctx: &MasContext, log: &Log) -> Box<dyn Agent> {
        Box::new(Tracer {
            core:      AgentCore::new(ctx, Box::new(InertBody::new())),
            log:       log.clone(),
            fail_exec: false,
        })
    }

    pub fn failing_tracer(ctx: &MasContext, log: &Log) -> Box<dyn Agent> {
        Box::new(Tracer {
            core:      AgentCore::new(ctx, Box::new(InertBody::new())),
            log:       log.clone(),
            fail_exec: true,
        })
    }

    pub fn hooks(log: &Log, id: AgentId) -> Vec<&'static str> {
        log.lock().unwrap().iter().filter(|(a, _)| *a == id).map(|(_, h)| *h).collect()
    }

    pub fn count(log: &Log, hook: &str) -> usize {
        log.lock().unwrap().iter().filter(|(_, h)| *h == hook).count()
    }

    /// Pushes itself by `velocity` every time it executes.
    pub struct Walker {
        core:     AgentCore,
        motion:   Motion,
        velocity: [f64; 3],
    }

    impl Agent for Walker {
        fn core(&self) -> &AgentCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut AgentCore {
            &mut self.core
        }
        fn exec(&mut self, _ctx: &StepContext) -> AgentResult {
            self.motion.add_force(self.velocity);
            Ok(())
        }
        fn location(&self) -> Option<Location> {
            Some(self.motion.location(0.1))
        }
        fn motion(&self) -> Option<&Motion> {
            Some(&self.motion)
        }
        fn motion_mut(&mut self) -> Option<&mut Motion> {
            Some(&mut self.motion)
        }
    }

    pub fn walker(ctx: &MasContext, at: [f64; 3], velocity: [f64; 3]) -> Box<dyn Agent> {
        Box::new(Walker {
            core: AgentCore::new(ctx, Box::new(InertBody::new())),
            motion: Motion::new(at),
            velocity,
        })
    }

    /// A world whose root holds one child layer `name`.
    pub fn world_with(ctx: &MasContext, name: &str) -> (World, LayerPath) {
        let mut world = World::new(ctx.clone(), "world");
        let path = world.add_layer(&LayerPath::root(), Layer::new(name)).unwrap();
        (world, path)
    }

    pub fn config(max_thread_groups: usize) -> MasConfig {
        MasConfig { max_thread_groups, duration: 10.0, ..MasConfig::default() }
    }
}

// ── group ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod group {
    use std::sync::{Arc, Mutex};

    use mas_agent::{AgentState, AgentStore, StepContext};
    use mas_core::{AgentId, MasContext, MemorySink, Severity, ThreadId};

    use super::support::{failing_tracer, hooks, tracer, Log};
    use crate::{GroupError, ThreadAgentGroup, process_agent};

    fn store_of(ctx: &MasContext, log: &Log, n: usize) -> (AgentStore, Vec<AgentId>) {
        let mut store = AgentStore::new();
        let ids = (0..n).map(|_| store.insert(tracer(ctx, log)).unwrap()).collect();
        (store, ids)
    }

    #[test]
    fn add_agent_reports_invalid_and_duplicate() {
        let mut g = ThreadAgentGroup::new(ThreadId(1));
        let err = g.add_agent(AgentId::UNASSIGNED).unwrap_err();
        assert_eq!(err, GroupError::InvalidAgent);
        assert_eq!(err.code(), 1);

        g.add_agent(AgentId(4)).unwrap();
        let err = g.add_agent(AgentId(4)).unwrap_err();
        assert_eq!(err, GroupError::AlreadyMember(AgentId(4)));
        assert_eq!(err.code(), 2);
        assert_eq!(g.len(), 1);

        assert!(!g.remove_agent(AgentId(9)));
        assert!(g.remove_agent(AgentId(4)));
        assert!(g.is_empty());
    }

    #[test]
    fn fresh_agent_goes_from_uninitialized_to_executed_in_one_call() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut store, ids) = store_of(&ctx, &log, 1);
        let agent = store.get_mut(ids[0]).unwrap();

        process_agent(agent, &StepContext::default()).unwrap();
        assert_eq!(hooks(&log, ids[0]), ["init", "start", "exec"]);
        assert_eq!(store.get(ids[0]).unwrap().state(), AgentState::Running);
    }

    #[test]
    fn stopped_agent_restarts_and_dead_agent_is_skipped() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut store, ids) = store_of(&ctx, &log, 2);

        store.get_mut(ids[0]).unwrap().core_mut().set_state(AgentState::Stopped);
        process_agent(store.get_mut(ids[0]).unwrap(), &StepContext::default()).unwrap();
        assert_eq!(hooks(&log, ids[0]), ["start", "exec"]);

        store.get_mut(ids[1]).unwrap().core_mut().set_state(AgentState::Dead);
        process_agent(store.get_mut(ids[1]).unwrap(), &StepContext::default()).unwrap();
        assert!(hooks(&log, ids[1]).is_empty());
        assert_eq!(store.get(ids[1]).unwrap().state(), AgentState::Dead);
    }

    #[test]
    fn run_only_processes_flagged_members() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut store, ids) = store_of(&ctx, &log, 3);
        let mut g = ThreadAgentGroup::new(ThreadId(1));
        for &id in &ids {
            g.add_agent(id).unwrap();
        }
        store.get_mut(ids[1]).unwrap().core_mut().set_to_be_executed(true);

        let mut batch = store.partition_mut(|_| Some(0)).remove(&0).unwrap();
        assert!(g.run(&mut batch, &StepContext::default(), &MemorySink::default()));
        assert!(g.has_succeeded());
        assert!(hooks(&log, ids[0]).is_empty());
        assert_eq!(hooks(&log, ids[1]), ["init", "start", "exec"]);
        assert!(hooks(&log, ids[2]).is_empty());
    }

    #[test]
    fn failing_hook_marks_group_but_others_still_run() {
        let ctx = MasContext::new();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut store = AgentStore::new();
        let bad = store.insert(failing_tracer(&ctx, &log)).unwrap();
        let good = store.insert(tracer(&ctx, &log)).unwrap();
        let mut g = ThreadAgentGroup::new(ThreadId(2));
        for id in [bad, good] {
            g.add_agent(id).unwrap();
            store.get_mut(id).unwrap().core_mut().set_to_be_executed(true);
        }

        let sink = MemorySink::default();
        let mut batch = store.partition_mut(|_| Some(0)).remove(&0).unwrap();
        assert!(!g.run(&mut batch, &StepContext::default(), &sink));
        assert!(!g.has_succeeded());
        assert_eq!(hooks(&log, good), ["init", "start", "exec"]);
        assert_eq!(sink.count(Severity::CannotProcess), 1);
    }

    #[test]
    fn stop_keeps_members_and_reset_clears_them() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut store, ids) = store_of(&ctx, &log, 2);
        let mut g = ThreadAgentGroup::new(ThreadId(1));
        for &id in &ids {
            g.add_agent(id).unwrap();
        }
        g.set_step_duration(0.5);

        g.stop(&mut store);
        assert!(ids.iter().all(|&id| store.get(id).unwrap().state() == AgentState::Stopped));
        assert_eq!(g.len(), 2);

        g.reset();
        assert!(g.is_empty());
        assert_eq!(g.step_duration(), 0.0);
    }
}

// ── scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use std::sync::{Arc, Mutex};

    use mas_core::{MasContext, StepClock};
    use mas_layer::World;

    use crate::{FnAction, Scheduler, SimError};

    type Trace = Arc<Mutex<Vec<String>>>;

    fn logging(trace: Trace, tag: &'static str) -> impl FnMut(&mut World, f64) -> bool + Send {
        move |_, now| {
            trace.lock().unwrap().push(format!("{tag}@{now}"));
            true
        }
    }

    #[test]
    fn punctual_action_before_time_zero_is_refused() {
        let mut s = Scheduler::new(StepClock::new(1.0, 10.0).unwrap());
        let refused = s.add_action(Box::new(FnAction::before_at("early", -1.0, |_, _| true)));
        assert!(matches!(refused, Err(SimError::ActionRefused { .. })));
        assert_eq!(s.pending_pre(), 0);
    }

    #[test]
    fn each_actions_repeat_and_punctual_ones_fire_once_when_due() {
        let trace = Trace::default();
        let mut world = World::new(MasContext::new(), "w");
        let mut s = Scheduler::new(StepClock::new(1.0, 10.0).unwrap());
        s.add_action(Box::new(FnAction::before_at("late", 2.0, logging(trace.clone(), "late")))).unwrap();
        s.add_action(Box::new(FnAction::before_at("soon", 0.5, logging(trace.clone(), "soon")))).unwrap();
        s.add_action(Box::new(FnAction::each_begin("each", logging(trace.clone(), "each")))).unwrap();
        s.add_action(Box::new(FnAction::each_end("tail", logging(trace.clone(), "tail")))).unwrap();
        assert_eq!((s.pending_pre(), s.pending_post()), (3, 1));

        s.clock_mut().compute_next_step_duration();
        s.process_pre_actions(&mut world).unwrap();
        s.process_post_actions(&mut world).unwrap();
        assert_eq!(*trace.lock().unwrap(), ["each@1", "soon@1", "tail@1"]);
        assert_eq!(s.pending_pre(), 2);

        trace.lock().unwrap().clear();
        s.clock_mut().compute_next_step_duration();
        s.process_pre_actions(&mut world).unwrap();
        assert_eq!(*trace.lock().unwrap(), ["each@2", "late@2"]);
        assert_eq!(s.pending_pre(), 1);
    }

    #[test]
    fn failing_action_is_reported() {
        let mut world = World::new(MasContext::new(), "w");
        let mut s = Scheduler::new(StepClock::new(1.0, 10.0).unwrap());
        s.add_action(Box::new(FnAction::each_end("broken", |_, _| false))).unwrap();
        s.clock_mut().compute_next_step_duration();
        match s.process_post_actions(&mut world) {
            Err(SimError::ActionFailed { name, time }) => {
                assert_eq!(name, "broken");
                assert_eq!(time, 1.0);
            }
            other => panic!("expected ActionFailed, got {other:?}"),
        }
    }
}

// ── sampler ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod sampler {
    use std::collections::BTreeSet;

    use mas_core::{AgentId, SimRng};

    use crate::{AgentSampler, FairSampler, UniformSampler};

    fn ids(range: std::ops::Range<u64>) -> BTreeSet<AgentId> {
        range.map(AgentId).collect()
    }

    #[test]
    fn uniform_draws_distinct_members() {
        let working = ids(1..21);
        let mut rng = SimRng::new(3);
        let picked = UniformSampler.sample(&working, 7, &BTreeSet::new(), &mut rng);
        assert_eq!(picked.len(), 7);
        assert!(picked.is_subset(&working));
        assert_eq!(UniformSampler.sample(&working, 20, &BTreeSet::new(), &mut rng), working);
        assert_eq!(UniformSampler.sample(&working, 50, &BTreeSet::new(), &mut rng), working);
    }

    #[test]
    fn same_seed_same_sample() {
        let working = ids(1..101);
        let a = UniformSampler.sample(&working, 10, &BTreeSet::new(), &mut SimRng::new(9));
        let b = UniformSampler.sample(&working, 10, &BTreeSet::new(), &mut SimRng::new(9));
        assert_eq!(a, b);
    }

    #[test]
    fn fair_prefers_agents_that_rested() {
        let working = ids(1..11);
        let last = ids(1..6);
        let mut rng = SimRng::new(1);

        let picked = FairSampler.sample(&working, 5, &last, &mut rng);
        assert_eq!(picked, ids(6..11));

        let picked = FairSampler.sample(&working, 7, &last, &mut rng);
        assert_eq!(picked.len(), 7);
        assert!(ids(6..11).is_subset(&picked));
        assert_eq!(picked.intersection(&last).count(), 2);
    }
}

// ── solver ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod solver {
    use mas_agent::{AgentStore, Motion};
    use mas_core::{AgentId, MasContext};

    use super::support::{Log, tracer, walker};
    use crate::{ConflictSolver, SpatialConflictSolver};

    fn request(store: &mut AgentStore, id: AgentId, target: [f64; 3]) {
        store.get_mut(id).unwrap().motion_mut().unwrap().request(target);
    }

    fn commit_all(store: &mut AgentStore, ids: &[AgentId]) {
        for &id in ids {
            store.get_mut(id).unwrap().motion_mut().unwrap().commit();
        }
    }

    fn position(store: &AgentStore, id: AgentId) -> [f64; 3] {
        store.get(id).and_then(|a| a.motion()).map(Motion::position).unwrap()
    }

    #[test]
    fn second_mover_is_pulled_back_along_its_journey() {
        let ctx = MasContext::new();
        let mut store = AgentStore::new();
        let a = store.insert(walker(&ctx, [0.0, 0.0, 0.0], [0.0; 3])).unwrap();
        let b = store.insert(walker(&ctx, [4.0, 0.0, 0.0], [0.0; 3])).unwrap();
        request(&mut store, a, [2.0, 0.0, 0.0]);
        request(&mut store, b, [2.0, 0.0, 0.0]);

        assert!(SpatialConflictSolver.solve(&mut store, &[a, b], 1.0));
        commit_all(&mut store, &[a, b]);
        assert_eq!(position(&store, a), [2.0, 0.0, 0.0]);
        assert_eq!(position(&store, b), [3.0, 0.0, 0.0]);
    }

    #[test]
    fn standing_agents_keep_their_spot() {
        let ctx = MasContext::new();
        let mut store = AgentStore::new();
        let mover = store.insert(walker(&ctx, [0.0, 0.0, 0.0], [0.0; 3])).unwrap();
        let still = store.insert(walker(&ctx, [2.0, 0.0, 0.0], [0.0; 3])).unwrap();
        request(&mut store, mover, [2.0, 0.0, 0.0]);

        assert!(SpatialConflictSolver.solve(&mut store, &[mover, still], 1.0));
        commit_all(&mut store, &[mover, still]);
        assert_eq!(position(&store, mover), [1.0, 0.0, 0.0]);
        assert_eq!(position(&store, still), [2.0, 0.0, 0.0]);
    }

    #[test]
    fn unsolvable_mover_stays_put_and_solve_fails() {
        let ctx = MasContext::new();
        let mut store = AgentStore::new();
        let still = store.insert(walker(&ctx, [1.0, 1.0, 1.0], [0.0; 3])).unwrap();
        let stuck = store.insert(walker(&ctx, [1.0, 1.0, 1.0], [0.0; 3])).unwrap();
        request(&mut store, stuck, [1.0, 1.0, 1.0]);

        assert!(!SpatialConflictSolver.solve(&mut store, &[still, stuck], 1.0));
        assert_eq!(store.get(stuck).and_then(|a| a.motion()).unwrap().requested(), None);
    }

    #[test]
    fn agents_without_motion_are_ignored() {
        let ctx = MasContext::new();
        let log = Log::default();
        let mut store = AgentStore::new();
        let p = store.insert(tracer(&ctx, &log)).unwrap();
        let w = store.insert(walker(&ctx, [0.0; 3], [0.0; 3])).unwrap();
        request(&mut store, w, [1.0, 0.0, 0.0]);

        assert!(SpatialConflictSolver.solve(&mut store, &[p, w], 1.0));
        commit_all(&mut store, &[w]);
        assert_eq!(position(&store, w), [1.0, 0.0, 0.0]);
    }
}

// ── manager ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod manager {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use mas_agent::{AgentStore, Motion, StepContext};
    use mas_core::{AgentId, MasConfig, MasContext, MasError};
    use mas_layer::{LayerPath, World};
    use mas_spatial::IndexRegistry;

    use super::support::{Log, config, count, tracer, walker, world_with};
    use crate::{ConflictSolver, SimError, SimulationManager};

    struct CountingSolver(Arc<AtomicUsize>);

    impl ConflictSolver for CountingSolver {
        fn name(&self) -> &str {
            "counting"
        }
        fn solve(&self, _store: &mut AgentStore, _agents: &[AgentId], _threshold: f64) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn populated(ctx: &MasContext, log: &Log, n: usize) -> World {
        let (mut world, crowd) = world_with(ctx, "crowd");
        for _ in 0..n {
            world.spawn(&crowd, tracer(ctx, log)).unwrap();
        }
        world.init();
        world
    }

    fn step(time: f64) -> StepContext {
        StepContext { step_duration: 1.0, current_time: time, displacement_threshold: -1.0 }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = MasConfig { max_thread_groups: 0, ..MasConfig::default() };
        let err = SimulationManager::new(MasContext::new(), &bad).unwrap_err();
        assert!(matches!(err, SimError::Core(MasError::Config(_))));
    }

    #[test]
    fn init_requires_top_layer_and_agents() {
        let ctx = MasContext::new();
        let mut m = SimulationManager::new(ctx.clone(), &config(2)).unwrap();
        let world = World::new(ctx.clone(), "world");

        let err = m.init(&world).unwrap_err();
        assert!(matches!(err, SimError::NoTopLayer));
        assert_eq!(err.code(), 2);

        m.set_top_layer(LayerPath::parse("/missing"));
        assert_eq!(m.init(&world).unwrap_err().code(), 2);

        m.set_top_layer(LayerPath::root());
        let err = m.init(&world).unwrap_err();
        assert!(matches!(err, SimError::NoAgents));
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn agents_are_spread_over_bounded_groups() {
        let ctx = MasContext::new();
        let log = Log::default();
        let world = populated(&ctx, &log, 10);
        let mut m = SimulationManager::new(ctx.clone(), &config(3)).unwrap();
        m.set_top_layer(LayerPath::root());

        assert_eq!(m.init(&world).unwrap(), 10);
        assert_eq!(m.group_count(), 3);
        let mut sizes: Vec<usize> = m.groups().map(|g| g.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, [3, 3, 4]);
        for &id in m.agents() {
            let owners = m.groups().filter(|g| g.contains(id)).count();
            assert_eq!(owners, 1, "{id} is in {owners} groups");
            assert!(m.group_of(id).is_some());
        }
    }

    #[test]
    fn add_agent_rejects_unassigned_and_ignores_duplicates() {
        let ctx = MasContext::new();
        let log = Log::default();
        let world = populated(&ctx, &log, 2);
        let mut m = SimulationManager::new(ctx.clone(), &config(2)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.init(&world).unwrap();

        let err = m.add_agent(AgentId::UNASSIGNED).unwrap_err();
        assert_eq!(err.code(), 1);

        let first = *m.agents().iter().next().unwrap();
        let home = m.group_of(first);
        m.add_agent(first).unwrap();
        assert_eq!(m.group_of(first), home);
        assert_eq!(m.agent_count(), 2);
    }

    #[test]
    fn emptied_group_is_reused_first() {
        let ctx = MasContext::new();
        let log = Log::default();
        let world = populated(&ctx, &log, 2);
        let mut m = SimulationManager::new(ctx.clone(), &config(4)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.init(&world).unwrap();

        let first = *m.agents().iter().next().unwrap();
        let freed = m.group_of(first).unwrap();
        assert!(m.remove_agent(first));
        assert!(!m.remove_agent(first));
        assert_eq!(m.find_thread_to_add_agent(), Some(freed));
    }

    #[test]
    fn one_step_executes_everyone_once() {
        let ctx = MasContext::new();
        let log = Log::default();
        let mut world = populated(&ctx, &log, 6);
        let mut indices = IndexRegistry::new(ctx.clone());
        let mut m = SimulationManager::new(ctx.clone(), &config(2)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.init(&world).unwrap();

        let report = m.run_one_step(&mut world, &mut indices, &step(1.0)).unwrap();
        assert_eq!(report.executed, 6);
        assert_eq!(report.step, 0);
        assert!(report.is_clean());
        assert_eq!(count(&log, "exec"), 6);

        m.run_one_step(&mut world, &mut indices, &step(2.0)).unwrap();
        assert_eq!(count(&log, "init"), 6);
        assert_eq!(count(&log, "exec"), 12);
        assert_eq!(m.steps_run(), 2);
    }

    #[test]
    fn step_before_init_is_refused() {
        let ctx = MasContext::new();
        let mut world = World::new(ctx.clone(), "world");
        let mut indices = IndexRegistry::new(ctx.clone());
        let mut m = SimulationManager::new(ctx.clone(), &config(2)).unwrap();
        let err = m.run_one_step(&mut world, &mut indices, &step(1.0)).unwrap_err();
        assert!(matches!(err, SimError::NotInitialized));
    }

    #[test]
    fn agents_per_step_limits_execution() {
        let ctx = MasContext::new();
        let log = Log::default();
        let mut world = populated(&ctx, &log, 10);
        let mut indices = IndexRegistry::new(ctx.clone());
        let cfg = MasConfig { agents_per_step: Some(3), ..config(4) };
        let mut m = SimulationManager::new(ctx.clone(), &cfg).unwrap();
        m.set_top_layer(LayerPath::root());
        m.init(&world).unwrap();

        let report = m.run_one_step(&mut world, &mut indices, &step(1.0)).unwrap();
        assert_eq!(report.executed, 3);
        assert_eq!(count(&log, "exec"), 3);
        assert_eq!(m.last_executed().len(), 3);
    }

    #[test]
    fn solvers_only_run_with_a_threshold() {
        let ctx = MasContext::new();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        let id = world.spawn(&crowd, walker(&ctx, [0.0; 3], [2.0, 0.0, 0.0])).unwrap();
        world.init();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut indices = IndexRegistry::new(ctx.clone());
        let mut m = SimulationManager::new(ctx.clone(), &config(1)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.add_conflict_solver(Box::new(CountingSolver(calls.clone())));
        m.init(&world).unwrap();

        let report = m.run_one_step(&mut world, &mut indices, &step(1.0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.moved, 1);
        let at = world.store().get(id).and_then(|a| a.motion()).map(Motion::position);
        assert_eq!(at, Some([2.0, 0.0, 0.0]));

        m.set_displacement_threshold(0.5);
        m.run_one_step(&mut world, &mut indices, &step(2.0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let at = world.store().get(id).and_then(|a| a.motion()).map(Motion::position);
        assert_eq!(at, Some([2.5, 0.0, 0.0]));
    }

    #[test]
    fn removed_solver_stops_running() {
        let ctx = MasContext::new();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        world.spawn(&crowd, walker(&ctx, [0.0; 3], [1.0, 0.0, 0.0])).unwrap();
        world.init();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut indices = IndexRegistry::new(ctx.clone());
        let mut m = SimulationManager::new(ctx.clone(), &config(1)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.set_displacement_threshold(0.5);
        m.add_conflict_solver(Box::new(CountingSolver(calls.clone())));
        m.init(&world).unwrap();

        m.run_one_step(&mut world, &mut indices, &step(1.0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(m.remove_conflict_solver("unknown").is_none());
        let removed = m.remove_conflict_solver("counting").map(|s| s.name().to_owned());
        assert_eq!(removed.as_deref(), Some("counting"));
        assert_eq!(m.solver_count(), 0);
        assert!(m.remove_conflict_solver("counting").is_none());

        m.run_one_step(&mut world, &mut indices, &step(2.0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sync_follows_spawned_and_destroyed_agents() {
        let ctx = MasContext::new();
        let log = Log::default();
        let mut world = populated(&ctx, &log, 3);
        let mut m = SimulationManager::new(ctx.clone(), &config(2)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.init(&world).unwrap();

        let gone = *m.agents().iter().next().unwrap();
        world.destroy_agent(gone);
        let fresh = world.spawn(&LayerPath::parse("/crowd"), tracer(&ctx, &log)).unwrap();
        m.sync_with(&world).unwrap();

        assert!(!m.agents().contains(&gone));
        assert!(m.agents().contains(&fresh));
        assert_eq!(m.agent_count(), 3);
    }

    #[test]
    fn stop_sets_every_agent_stopped() {
        let ctx = MasContext::new();
        let log = Log::default();
        let mut world = populated(&ctx, &log, 4);
        let mut indices = IndexRegistry::new(ctx.clone());
        let mut m = SimulationManager::new(ctx.clone(), &config(2)).unwrap();
        m.set_top_layer(LayerPath::root());
        m.init(&world).unwrap();
        m.run_one_step(&mut world, &mut indices, &step(1.0)).unwrap();

        m.stop(world.store_mut());
        assert!(world.store().iter().all(|(_, a)| a.state() == mas_agent::AgentState::Stopped));
    }
}

// ── simulation ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod simulation {
    use mas_agent::AgentState;
    use mas_core::{MasConfig, MasContext};
    use mas_layer::{Layer, LayerPath, World};
    use mas_spatial::Bounds;

    use super::support::{Log, config, tracer, walker, world_with};
    use crate::{
        FnAction, NoopObserver, RunState, SimBuilder, SimError, SimObserver, StepReport,
    };

    #[derive(Default)]
    struct Recorder {
        starts:  usize,
        reports: Vec<StepReport>,
        ended:   Option<RunState>,
    }

    impl SimObserver for Recorder {
        fn on_step_start(&mut self, _step: u64, _time: f64) {
            self.starts += 1;
        }
        fn on_step_completed(&mut self, report: &StepReport) {
            self.reports.push(report.clone());
        }
        fn on_run_end(&mut self, state: RunState, _time: f64) {
            self.ended = Some(state);
        }
    }

    #[test]
    fn two_sublayers_one_step_everyone_running() {
        let ctx = MasContext::new();
        let log = Log::default();
        let mut world = World::new(ctx.clone(), "world");
        let a = world.add_layer(&LayerPath::root(), Layer::new("A")).unwrap();
        let b = world.add_layer(&LayerPath::root(), Layer::new("B")).unwrap();
        for _ in 0..5 {
            world.spawn(&a, tracer(&ctx, &log)).unwrap();
            world.spawn(&b, tracer(&ctx, &log)).unwrap();
        }
        world.init();
        assert_eq!(world.root().agents().len(), 10);

        let mut sim = SimBuilder::new(config(2), world).build().unwrap();
        let mut rec = Recorder::default();
        let report = sim.step(&mut rec).unwrap().unwrap();

        assert_eq!(report.executed, 10);
        assert_eq!(rec.reports.len(), 1);
        assert!(sim.manager().group_count() <= 2);
        assert!(sim.world().store().iter().all(|(_, agent)| agent.state().has_started()));
        assert_eq!(sim.state(), RunState::Running);
    }

    #[test]
    fn run_clips_the_last_step_and_stops_agents() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        world.spawn(&crowd, tracer(&ctx, &log)).unwrap();
        let cfg = MasConfig { step_duration: 3.0, duration: 10.0, ..config(1) };
        let mut sim = SimBuilder::new(cfg, world).build().unwrap();

        let mut rec = Recorder::default();
        assert_eq!(sim.run(&mut rec).unwrap(), RunState::Complete);
        let durations: Vec<f64> = rec.reports.iter().map(|r| r.duration).collect();
        assert_eq!(durations, [3.0, 3.0, 3.0, 1.0]);
        assert_eq!(rec.reports.last().map(|r| r.time), Some(10.0));
        assert_eq!(rec.starts, 4);
        assert_eq!(rec.ended, Some(RunState::Complete));
        assert!(sim.world().store().iter().all(|(_, a)| a.state() == AgentState::Stopped));
    }

    #[test]
    fn init_failure_carries_start_up_code() {
        let ctx = MasContext::new();
        let (world, _) = world_with(&ctx, "empty");
        let mut sim = SimBuilder::new(config(1), world).build().unwrap();
        let err = sim.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, SimError::NoAgents));
        assert_eq!(err.code(), 3);
        assert_eq!(sim.state(), RunState::Stopped);
    }

    #[test]
    fn stop_handle_ends_the_run_between_steps() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        world.spawn(&crowd, tracer(&ctx, &log)).unwrap();
        let mut sim = SimBuilder::new(config(1), world).build().unwrap();

        let handle = sim.stop_handle();
        sim.scheduler_mut()
            .add_action(Box::new(FnAction::each_end("halt", move |_, _| {
                handle.request_stop();
                true
            })))
            .unwrap();

        let mut rec = Recorder::default();
        assert_eq!(sim.run(&mut rec).unwrap(), RunState::Stopped);
        assert_eq!(rec.reports.len(), 1);
        assert!(!sim.stop_handle().is_stop_requested());
    }

    #[test]
    fn failing_action_aborts_the_run() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        world.spawn(&crowd, tracer(&ctx, &log)).unwrap();
        let mut sim = SimBuilder::new(config(1), world)
            .action(Box::new(FnAction::before_at("explode", 3.0, |_, _| false)))
            .build()
            .unwrap();

        let mut rec = Recorder::default();
        let err = sim.run(&mut rec).unwrap_err();
        assert!(matches!(err, SimError::ActionFailed { .. }));
        assert_eq!(rec.reports.len(), 2);
        assert_eq!(rec.ended, Some(RunState::Stopped));
    }

    #[test]
    fn run_steps_can_be_resumed() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        world.spawn(&crowd, tracer(&ctx, &log)).unwrap();
        let mut sim = SimBuilder::new(config(1), world).build().unwrap();

        assert_eq!(sim.run_steps(4, &mut NoopObserver).unwrap(), 4);
        assert_eq!(sim.current_time(), 4.0);
        assert_eq!(sim.run_steps(100, &mut NoopObserver).unwrap(), 6);
        assert_eq!(sim.state(), RunState::Complete);
    }

    #[test]
    fn spatial_index_follows_moving_agents() {
        let ctx = MasContext::new();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        let mover = world.spawn(&crowd, walker(&ctx, [0.0; 3], [1.0, 0.0, 0.0])).unwrap();
        let still = world.spawn(&crowd, walker(&ctx, [5.0, 0.0, 0.0], [0.0; 3])).unwrap();
        let mut sim = SimBuilder::new(config(2), world)
            .octree("crowd", crowd.clone(), Bounds::new([-10.0; 3], [10.0; 3]))
            .build()
            .unwrap();

        sim.init().unwrap();
        let handle = sim.indices().handles_for(&crowd)[0];
        let query_point = [2.6, 0.0, 0.0];
        assert_eq!(sim.indices().get(handle).unwrap().nearest(query_point), Some(still));

        let report = sim.step(&mut NoopObserver).unwrap().unwrap();
        assert_eq!(report.refreshed_indices, 1);
        assert_eq!(sim.indices().get(handle).unwrap().nearest(query_point), Some(mover));
    }

    #[test]
    fn index_on_missing_layer_is_rejected() {
        let ctx = MasContext::new();
        let (world, _) = world_with(&ctx, "crowd");
        let built = SimBuilder::new(config(1), world)
            .octree("ghost", LayerPath::parse("/nowhere"), Bounds::new([0.0; 3], [1.0; 3]))
            .build();
        assert!(matches!(built, Err(SimError::Layer(_))));
    }

    #[test]
    fn agents_spawned_mid_run_join_the_next_step() {
        let ctx = MasContext::new();
        let log = Log::default();
        let (mut world, crowd) = world_with(&ctx, "crowd");
        world.spawn(&crowd, tracer(&ctx, &log)).unwrap();
        let mut sim = SimBuilder::new(config(2), world).build().unwrap();
        sim.step(&mut NoopObserver).unwrap();

        let spawn_ctx = sim.world().ctx().clone();
        let late = sim.world_mut().spawn(&crowd, tracer(&spawn_ctx, &log)).unwrap();
        let report = sim.step(&mut NoopObserver).unwrap().unwrap();
        assert_eq!(report.executed, 2);
        assert!(sim.manager().group_of(late).is_some());
    }
}

// ── properties ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use mas_agent::StepContext;
    use mas_core::MasContext;
    use mas_layer::LayerPath;
    use mas_spatial::IndexRegistry;

    use super::support::{Log, config, count, hooks, tracer, world_with};
    use crate::SimulationManager;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn every_agent_in_one_group_and_processed_once(agents in 1usize..40, groups in 1usize..6) {
            let ctx = MasContext::new();
            let log = Log::default();
            let (mut world, crowd) = world_with(&ctx, "crowd");
            for _ in 0..agents {
                world.spawn(&crowd, tracer(&ctx, &log)).unwrap();
            }
            world.init();

            let mut m = SimulationManager::new(ctx.clone(), &config(groups)).unwrap();
            m.set_top_layer(LayerPath::root());
            m.init(&world).unwrap();
            prop_assert!(m.group_count() <= groups);
            for &id in m.agents() {
                prop_assert_eq!(m.groups().filter(|g| g.contains(id)).count(), 1);
            }

            let mut indices = IndexRegistry::new(ctx.clone());
            let step = StepContext { step_duration: 1.0, current_time: 1.0, displacement_threshold: -1.0 };
            m.run_one_step(&mut world, &mut indices, &step).unwrap();
            prop_assert_eq!(count(&log, "exec"), agents);
            for &id in m.agents() {
                prop_assert_eq!(hooks(&log, id), vec!["init", "start", "exec"]);
            }
        }
    }
}
