//! Thread agent groups: the unit of parallel execution.
//!
//! Membership is exclusive.  The manager never places an agent in two groups,
//! so every group can drive its agents on its own worker without locking.

use std::collections::BTreeSet;

use mas_agent::{Agent, AgentResult, AgentState, AgentStore, StepContext};
use mas_core::{AgentId, MessageSink, Severity, ThreadId};

use crate::GroupError;

const SOURCE: &str = "ThreadAgentGroup";

// ── process_agent ─────────────────────────────────────────────────────────────

/// Drive one agent through as many lifecycle transitions as it needs to
/// reach execution.
///
/// A brand-new agent is initialised, started and executed in one call;
/// a stopped agent is restarted then executed; a running one only executes.
/// Dead agents are left alone.
pub fn process_agent(agent: &mut dyn Agent, step: &StepContext) -> AgentResult {
    loop {
        match agent.state() {
            AgentState::Uninitialized => {
                agent.init(step)?;
                agent.core_mut().set_state(AgentState::WaitingToStart);
            }
            AgentState::WaitingToStart | AgentState::Stopped => {
                agent.start(step)?;
                agent.core_mut().set_state(AgentState::Running);
            }
            AgentState::Running => return agent.exec(step),
            AgentState::Dead => return Ok(()),
        }
    }
}

// ── ThreadAgentGroup ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ThreadAgentGroup {
    id:            ThreadId,
    members:       BTreeSet<AgentId>,
    step_duration: f64,
    succeeded:     bool,
}

impl ThreadAgentGroup {
    pub fn new(id: ThreadId) -> Self {
        Self { id, members: BTreeSet::new(), step_duration: 0.0, succeeded: false }
    }

    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn add_agent(&mut self, agent: AgentId) -> Result<(), GroupError> {
        if !agent.is_assigned() {
            return Err(GroupError::InvalidAgent);
        }
        if !self.members.insert(agent) {
            return Err(GroupError::AlreadyMember(agent));
        }
        Ok(())
    }

    /// No-op if `agent` is not a member.
    pub fn remove_agent(&mut self, agent: AgentId) -> bool {
        self.members.remove(&agent)
    }

    #[inline]
    pub fn contains(&self, agent: AgentId) -> bool {
        self.members.contains(&agent)
    }

    pub fn members(&self) -> &BTreeSet<AgentId> {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    pub fn set_step_duration(&mut self, step_duration: f64) {
        self.step_duration = step_duration;
    }

    /// Outcome of the last [`run`](Self::run).
    #[inline]
    pub fn has_succeeded(&self) -> bool {
        self.succeeded
    }

    /// Process every agent of `batch` flagged for execution.
    ///
    /// `batch` must hold exactly this group's members.  A failing hook is
    /// reported to `sink`, the remaining agents still run, and the group is
    /// marked as not succeeded.
    pub fn run(&mut self, batch: &mut [&mut dyn Agent], step: &StepContext, sink: &dyn MessageSink) -> bool {
        let mut ok = true;
        for agent in batch.iter_mut() {
            debug_assert!(self.members.contains(&agent.id()), "{} ran a foreign agent", self.id);
            if !agent.core().is_to_be_executed() {
                continue;
            }
            if let Err(e) = process_agent(&mut **agent, step) {
                sink.message(
                    Severity::CannotProcess,
                    &format!("{}: agent {} failed: {e}", self.id, agent.id()),
                    SOURCE,
                );
                ok = false;
            }
        }
        self.succeeded = ok;
        ok
    }

    /// Stop every member; membership is kept.
    pub fn stop(&self, store: &mut AgentStore) {
        for &id in &self.members {
            if let Some(agent) = store.get_mut(id) {
                agent.stop();
            }
        }
    }

    /// Forget every member and zero the step duration.
    pub fn reset(&mut self) {
        self.members.clear();
        self.step_duration = 0.0;
        self.succeeded = false;
    }
}
