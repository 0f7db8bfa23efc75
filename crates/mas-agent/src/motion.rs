//! Displacement bookkeeping for agents that move.
//!
//! A moving agent accumulates forces while it executes, then turns them into
//! a *requested* position.  The request is only applied by
//! [`Motion::commit`] once conflict solving has accepted it, so agents never
//! observe each other half-moved.

use mas_core::Location;

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Motion {
    position:  [f64; 3],
    force:     [f64; 3],
    requested: Option<[f64; 3]>,
}

impl Motion {
    pub fn new(position: [f64; 3]) -> Self {
        Self { position, ..Self::default() }
    }

    #[inline]
    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    #[inline]
    pub fn force(&self) -> [f64; 3] {
        self.force
    }

    #[inline]
    pub fn requested(&self) -> Option<[f64; 3]> {
        self.requested
    }

    /// Accumulate a force to be applied at the next `request_from_force`.
    pub fn add_force(&mut self, f: [f64; 3]) {
        for (acc, x) in self.force.iter_mut().zip(f) {
            *acc += x;
        }
    }

    /// Request an explicit target position, replacing any pending request.
    pub fn request(&mut self, target: [f64; 3]) {
        self.requested = Some(target);
    }

    pub fn cancel_request(&mut self) {
        self.requested = None;
    }

    /// Turn the accumulated force into a requested move and reset the force.
    ///
    /// The displacement equals the force; a non-negative `threshold` caps its
    /// length.  A zero displacement requests nothing.
    pub fn request_from_force(&mut self, threshold: f64) {
        let mut step = std::mem::take(&mut self.force);
        let len = step.iter().map(|x| x * x).sum::<f64>().sqrt();
        if len == 0.0 {
            return;
        }
        if threshold >= 0.0 && len > threshold {
            let scale = threshold / len;
            step.iter_mut().for_each(|x| *x *= scale);
        }
        self.requested = Some([
            self.position[0] + step[0],
            self.position[1] + step[1],
            self.position[2] + step[2],
        ]);
    }

    /// Apply the pending request.  Returns `false` when nothing was requested.
    pub fn commit(&mut self) -> bool {
        match self.requested.take() {
            Some(target) => {
                self.position = target;
                true
            }
            None => false,
        }
    }

    /// Location of a sphere of `radius` at the current position.
    pub fn location(&self, radius: f64) -> Location {
        Location::new(self.position, radius)
    }
}
