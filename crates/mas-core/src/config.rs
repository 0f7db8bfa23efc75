//! Run configuration.

use crate::{MasError, MasResult};

/// Default upper bound on concurrently running thread agent groups.
pub const DEFAULT_MAX_THREAD_GROUPS: usize = 12;

/// Default octree bucket capacity.
pub const DEFAULT_BUCKET_CAPACITY: usize = 8;

/// Top-level simulation configuration.
///
/// Typically built in code or deserialised (with the `serde` feature) by the
/// application and handed to `SimBuilder`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MasConfig {
    /// Simulated time consumed by one step.
    pub step_duration: f64,

    /// Total simulated time of the run.
    pub duration: f64,

    /// Maximum number of thread agent groups (and rayon workers).
    pub max_thread_groups: usize,

    /// Largest displacement an agent may make in one step.  Negative
    /// disables both clamping and conflict solving.
    pub displacement_threshold: f64,

    /// `None` executes every agent each step; `Some(n)` executes `n` sampled
    /// agents per step.
    pub agents_per_step: Option<usize>,

    /// Master RNG seed.  The same seed always produces identical sampling.
    pub seed: u64,

    /// Maximum sites held by an octree bucket before it subdivides.
    pub bucket_capacity: usize,
}

impl Default for MasConfig {
    fn default() -> Self {
        Self {
            step_duration:          1.0,
            duration:               1.0,
            max_thread_groups:      DEFAULT_MAX_THREAD_GROUPS,
            displacement_threshold: -1.0,
            agents_per_step:        None,
            seed:                   0,
            bucket_capacity:        DEFAULT_BUCKET_CAPACITY,
        }
    }
}

impl MasConfig {
    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> MasResult<()> {
        if self.step_duration.is_nan() || self.step_duration <= 0.0 {
            return Err(MasError::Config(format!(
                "step_duration must be > 0, got {}",
                self.step_duration
            )));
        }
        if self.duration.is_nan() || self.duration <= 0.0 {
            return Err(MasError::Config(format!(
                "duration must be > 0, got {}",
                self.duration
            )));
        }
        if self.max_thread_groups == 0 {
            return Err(MasError::Config("max_thread_groups must be at least 1".into()));
        }
        if self.bucket_capacity == 0 {
            return Err(MasError::Config("bucket_capacity must be at least 1".into()));
        }
        if self.displacement_threshold.is_nan() {
            return Err(MasError::Config("displacement_threshold is NaN".into()));
        }
        if self.agents_per_step == Some(0) {
            return Err(MasError::Config("agents_per_step must be at least 1 when set".into()));
        }
        Ok(())
    }

    /// `true` when agent displacement is clamped and conflicts are solved.
    #[inline]
    pub fn threshold_enabled(&self) -> bool {
        self.displacement_threshold >= 0.0
    }
}
