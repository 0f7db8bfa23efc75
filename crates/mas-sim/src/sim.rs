//! The `Simulation` struct and its run loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mas_agent::StepContext;
use mas_core::{MasConfig, Severity};
use mas_layer::World;
use mas_spatial::IndexRegistry;

use crate::{Scheduler, SimObserver, SimResult, SimulationManager, StepReport};

const SOURCE: &str = "Simulation";

// ── RunState ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    Uninitialized,
    /// Agents are spread over thread groups; no step has run yet.
    Initialized,
    Running,
    /// A stop was requested or a step failed.
    Stopped,
    /// The clock reached the configured duration.
    Complete,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Uninitialized => "UNINITIALIZED",
            RunState::Initialized   => "INITIALIZED",
            RunState::Running       => "RUNNING",
            RunState::Stopped       => "STOPPED",
            RunState::Complete      => "COMPLETE",
        })
    }
}

// ── StopHandle ────────────────────────────────────────────────────────────────

/// Cloneable handle requesting a running simulation to stop.
///
/// The request is honoured between steps: an in-flight step always runs to
/// completion.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume a pending request.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// The main simulation runner.
///
/// Owns the world, the spatial index registry, the manager and the scheduler,
/// and drives the step loop:
///
/// 1. **Clock**: the scheduler computes the next step duration; zero ends
///    the run.
/// 2. **Pre actions**: every due `*Begin*`/`*Before*` action.
/// 3. **Step**: [`SimulationManager::run_one_step`].
/// 4. **Post actions**: every due `*End*`/`*After*` action.
/// 5. **Notify**: [`SimObserver::on_step_completed`].
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Simulation {
    config:    MasConfig,
    world:     World,
    indices:   IndexRegistry,
    manager:   SimulationManager,
    scheduler: Scheduler,
    state:     RunState,
    stop:      StopHandle,
}

impl Simulation {
    pub(crate) fn from_parts(
        config:    MasConfig,
        world:     World,
        indices:   IndexRegistry,
        manager:   SimulationManager,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            config,
            world,
            indices,
            manager,
            scheduler,
            state: RunState::Uninitialized,
            stop:  StopHandle::default(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &MasConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world.  Agents spawned under the top layer are
    /// picked up at the start of the next step.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn indices(&self) -> &IndexRegistry {
        &self.indices
    }

    pub fn indices_mut(&mut self) -> &mut IndexRegistry {
        &mut self.indices
    }

    pub fn manager(&self) -> &SimulationManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SimulationManager {
        &mut self.manager
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[inline]
    pub fn current_time(&self) -> f64 {
        self.scheduler.clock().current_time()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Initialise the layer tree, rewind the clock and spread the top layer's
    /// agents over thread groups.  Returns the number of managed agents.
    ///
    /// Fails with `NoTopLayer` (code 2) or `NoAgents` (code 3).
    pub fn init(&mut self) -> SimResult<usize> {
        self.world.init();
        self.scheduler.clock_mut().init();
        let managed = self.manager.init(&self.world)?;
        if let Some(top) = self.manager.top_layer() {
            self.indices.refresh_reachable(&self.world, top);
        }
        self.state = RunState::Initialized;
        Ok(managed)
    }

    /// Run until the clock reaches the configured duration or a stop is
    /// requested, then stop every agent.
    ///
    /// Initialises first if needed.  A failing action aborts the run with
    /// the error, leaving the simulation `Stopped`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunState> {
        let outcome = self.run_loop(observer);
        if outcome.is_err() {
            self.state = RunState::Stopped;
        }
        self.manager.stop(self.world.store_mut());
        self.world.ctx().message(
            Severity::Info,
            &format!("run ended {} at t={}", self.state, self.current_time()),
            SOURCE,
        );
        observer.on_run_end(self.state, self.current_time());
        outcome.map(|()| self.state)
    }

    /// Run at most `n` steps.  Agents are not stopped afterwards, so runs can
    /// be resumed.  Returns the number of steps executed.
    pub fn run_steps<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<u64> {
        let mut done = 0;
        while done < n {
            if self.stop.take() {
                self.state = RunState::Stopped;
                break;
            }
            if self.step(observer)?.is_none() {
                break;
            }
            done += 1;
        }
        Ok(done)
    }

    /// Run a single step.  Returns `None` once the configured duration has
    /// been reached.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<Option<StepReport>> {
        if self.state == RunState::Uninitialized {
            self.init()?;
        }
        let duration = self.scheduler.clock_mut().compute_next_step_duration();
        if duration <= 0.0 {
            self.state = RunState::Complete;
            return Ok(None);
        }
        self.state = RunState::Running;
        let now = self.current_time();
        observer.on_step_start(self.manager.steps_run(), now);

        self.scheduler.process_pre_actions(&mut self.world)?;
        self.manager.sync_with(&self.world)?;

        let step = StepContext {
            step_duration:          duration,
            current_time:           now,
            displacement_threshold: self.manager.displacement_threshold(),
        };
        let report = self.manager.run_one_step(&mut self.world, &mut self.indices, &step)?;

        self.scheduler.process_post_actions(&mut self.world)?;
        observer.on_step_completed(&report);
        Ok(Some(report))
    }

    /// Forget the thread groups and rewind the clock; the next step
    /// initialises again.
    pub fn reset(&mut self) {
        self.manager.reset();
        self.scheduler.clock_mut().init();
        self.state = RunState::Uninitialized;
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn run_loop<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        loop {
            if self.stop.take() {
                self.state = RunState::Stopped;
                return Ok(());
            }
            if self.step(observer)?.is_none() {
                return Ok(());
            }
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("world", &self.world)
            .field("manager", &self.manager)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
