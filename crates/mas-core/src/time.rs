//! Simulation time model.
//!
//! # Design
//!
//! Simulated time is a continuous `f64` quantity.  A run is described by a
//! configured step duration and a total duration; the clock hands out one
//! step at a time and clips the last step so the run lands exactly on the
//! total:
//!
//!   next = step                 if (total - current) / step > 1
//!   next = total - current      otherwise
//!
//! A returned duration of zero (or less) means the run is over.

use std::fmt;

use crate::{MasError, MasResult};

// ── StepClock ─────────────────────────────────────────────────────────────────

/// Step duration, current time and total duration of one simulation run.
///
/// `StepClock` is plain data owned by whoever drives the run; there is no
/// process-wide clock.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepClock {
    step_duration: f64,
    current_time:  f64,
    duration:      f64,
}

impl StepClock {
    /// Clock configured for `duration` time units split into steps of
    /// `step_duration`.
    pub fn new(step_duration: f64, duration: f64) -> MasResult<Self> {
        let mut clock = Self::default();
        clock.set_step_duration(step_duration)?;
        clock.set_duration(duration)?;
        Ok(clock)
    }

    /// Zero step duration, current time and total duration.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Rewind to time zero, keeping the configured durations.
    pub fn init(&mut self) {
        self.current_time = 0.0;
    }

    pub fn set_step_duration(&mut self, step_duration: f64) -> MasResult<()> {
        if step_duration.is_nan() || step_duration <= 0.0 {
            return Err(MasError::InvalidDuration(step_duration));
        }
        self.step_duration = step_duration;
        Ok(())
    }

    pub fn set_duration(&mut self, duration: f64) -> MasResult<()> {
        if duration.is_nan() || duration <= 0.0 {
            return Err(MasError::InvalidDuration(duration));
        }
        self.duration = duration;
        Ok(())
    }

    /// Duration of the next step, advancing the current time by it.
    ///
    /// Returns `0.0` once the total duration has been reached or when no step
    /// duration is configured.
    ///
    /// Steps accumulate in floating point, so a step that does not divide the
    /// total exactly can leave a sliver: a `0.1` step over `1.0` yields ten
    /// full steps followed by one of about `1.1e-16`.
    pub fn compute_next_step_duration(&mut self) -> f64 {
        if self.step_duration <= 0.0 {
            return 0.0;
        }
        let remaining = (self.duration - self.current_time).max(0.0);
        let next = if remaining / self.step_duration > 1.0 {
            self.step_duration
        } else {
            remaining
        };
        self.current_time += next;
        next
    }

    #[inline]
    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    #[inline]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// `true` once the current time has reached the total duration.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current_time >= self.duration
    }
}

impl fmt::Display for StepClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={} / {} (step {})",
            self.current_time, self.duration, self.step_duration
        )
    }
}
