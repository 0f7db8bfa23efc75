//! Actions scheduled around simulation steps.

use std::fmt;

use mas_layer::World;

/// When an action fires relative to a step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionFrequency {
    /// Once, before the first step whose time reaches the action's time.
    PunctualBeforeIteration,
    /// Once, after the first step whose time reaches the action's time.
    PunctualAfterIteration,
    /// Before every step.
    EachBeginIteration,
    /// After every step.
    EachEndIteration,
}

impl ActionFrequency {
    #[inline]
    pub fn is_punctual(self) -> bool {
        matches!(self, Self::PunctualBeforeIteration | Self::PunctualAfterIteration)
    }

    /// Runs before the agents execute.
    #[inline]
    pub fn is_before(self) -> bool {
        matches!(self, Self::PunctualBeforeIteration | Self::EachBeginIteration)
    }
}

impl fmt::Display for ActionFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PunctualBeforeIteration => "PUNCTUAL_BEFORE_ITERATION",
            Self::PunctualAfterIteration  => "PUNCTUAL_AFTER_ITERATION",
            Self::EachBeginIteration      => "EACH_BEGIN_ITERATION",
            Self::EachEndIteration        => "EACH_END_ITERATION",
        })
    }
}

/// Work run by the [`Scheduler`](crate::Scheduler) outside the parallel
/// section of a step, with full mutable access to the world.
pub trait Action: Send {
    fn name(&self) -> &str;

    fn frequency(&self) -> ActionFrequency;

    /// Simulated time at which a punctual action becomes due.  Ignored for
    /// the `Each*` frequencies.
    fn time(&self) -> f64 {
        0.0
    }

    /// Returns `false` on failure, which aborts the run.
    fn exec(&mut self, world: &mut World, now: f64) -> bool;
}

// ── FnAction ──────────────────────────────────────────────────────────────────

/// An [`Action`] backed by a closure.
///
/// ```rust,ignore
/// let tick = FnAction::each_end("count", move |_world, _now| { n += 1; true });
/// ```
pub struct FnAction<F> {
    name:      String,
    frequency: ActionFrequency,
    time:      f64,
    f:         F,
}

impl<F> FnAction<F>
where
    F: FnMut(&mut World, f64) -> bool + Send,
{
    pub fn new(name: impl Into<String>, frequency: ActionFrequency, time: f64, f: F) -> Self {
        Self { name: name.into(), frequency, time, f }
    }

    pub fn each_begin(name: impl Into<String>, f: F) -> Self {
        Self::new(name, ActionFrequency::EachBeginIteration, 0.0, f)
    }

    pub fn each_end(name: impl Into<String>, f: F) -> Self {
        Self::new(name, ActionFrequency::EachEndIteration, 0.0, f)
    }

    pub fn before_at(name: impl Into<String>, time: f64, f: F) -> Self {
        Self::new(name, ActionFrequency::PunctualBeforeIteration, time, f)
    }

    pub fn after_at(name: impl Into<String>, time: f64, f: F) -> Self {
        Self::new(name, ActionFrequency::PunctualAfterIteration, time, f)
    }
}

impl<F> Action for FnAction<F>
where
    F: FnMut(&mut World, f64) -> bool + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn frequency(&self) -> ActionFrequency {
        self.frequency
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn exec(&mut self, world: &mut World, now: f64) -> bool {
        (self.f)(world, now)
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .field("frequency", &self.frequency)
            .field("time", &self.time)
            .finish()
    }
}
