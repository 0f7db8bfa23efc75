//! Simulation observer trait for progress reporting and data collection.

use crate::{RunState, StepReport};

/// Callbacks invoked by [`Simulation::run`][crate::Simulation::run] at key
/// points of the step loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter;
///
/// impl SimObserver for ProgressPrinter {
///     fn on_step_completed(&mut self, report: &StepReport) {
///         println!("t={:.2}: {} agents ran", report.time, report.executed);
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called once the step's duration is known, before any processing.
    fn on_step_start(&mut self, _step: u64, _time: f64) {}

    /// Called exactly once per step, after the spatial indices were
    /// refreshed and the post-step actions ran.
    fn on_step_completed(&mut self, _report: &StepReport) {}

    /// Called once when [`run`][crate::Simulation::run] returns, whether the
    /// run completed, was stopped, or failed.
    fn on_run_end(&mut self, _state: RunState, _time: f64) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want progress callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
