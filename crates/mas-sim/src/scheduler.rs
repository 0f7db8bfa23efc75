//! Simulated time plus the actions scheduled around each step.

use mas_core::StepClock;
use mas_layer::World;

use crate::{Action, SimError, SimResult};

pub struct Scheduler {
    clock: StepClock,
    pre:   Vec<Box<dyn Action>>,
    post:  Vec<Box<dyn Action>>,
}

impl Scheduler {
    pub fn new(clock: StepClock) -> Self {
        Self { clock, pre: Vec::new(), post: Vec::new() }
    }

    #[inline]
    pub fn clock(&self) -> &StepClock {
        &self.clock
    }

    #[inline]
    pub fn clock_mut(&mut self) -> &mut StepClock {
        &mut self.clock
    }

    /// Schedule `action`.  Punctual actions with a negative time are refused.
    ///
    /// Both queues stay sorted by time; actions with equal times keep their
    /// insertion order.
    pub fn add_action(&mut self, action: Box<dyn Action>) -> SimResult<()> {
        let frequency = action.frequency();
        let time = action.time();
        if frequency.is_punctual() && (time.is_nan() || time < 0.0) {
            return Err(SimError::ActionRefused {
                name:   action.name().to_owned(),
                reason: "punctual action scheduled before time zero",
            });
        }
        let queue = if frequency.is_before() { &mut self.pre } else { &mut self.post };
        let at = queue.partition_point(|a| a.time() <= time);
        queue.insert(at, action);
        Ok(())
    }

    pub fn pending_pre(&self) -> usize {
        self.pre.len()
    }

    pub fn pending_post(&self) -> usize {
        self.post.len()
    }

    pub fn process_pre_actions(&mut self, world: &mut World) -> SimResult<()> {
        process(&mut self.pre, world, self.clock.current_time())
    }

    pub fn process_post_actions(&mut self, world: &mut World) -> SimResult<()> {
        process(&mut self.post, world, self.clock.current_time())
    }

    /// Drop every action and zero the clock.
    pub fn reset(&mut self) {
        self.pre.clear();
        self.post.clear();
        self.clock.reset();
    }
}

/// Run due actions in time order.  `Each*` actions always run; punctual ones
/// run once their time is reached and are then dropped.  Stops at the first
/// failure.
fn process(queue: &mut Vec<Box<dyn Action>>, world: &mut World, now: f64) -> SimResult<()> {
    let mut i = 0;
    while i < queue.len() {
        let action = &mut queue[i];
        let punctual = action.frequency().is_punctual();
        if punctual && action.time() > now {
            i += 1;
            continue;
        }
        if !action.exec(world, now) {
            return Err(SimError::ActionFailed { name: action.name().to_owned(), time: now });
        }
        if punctual {
            queue.remove(i);
        } else {
            i += 1;
        }
    }
    Ok(())
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("clock", &self.clock)
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}
