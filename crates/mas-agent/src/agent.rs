//! The `Agent` trait and the state every agent carries.

use mas_core::{AgentId, Color, IdLease, Location, MasContext};

use crate::state::next_logical_state;
use crate::{AgentResult, AgentState, Body, Motion, TransitionError};

// ── StepContext ───────────────────────────────────────────────────────────────

/// Read-only view of the current step handed to lifecycle hooks.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StepContext {
    /// Simulated time consumed by this step.
    pub step_duration: f64,
    /// Simulated time at the end of this step.
    pub current_time: f64,
    /// Displacement cap for this step; negative means uncapped.
    pub displacement_threshold: f64,
}

// ── AgentCore ─────────────────────────────────────────────────────────────────

/// Identifier, lifecycle state, body, execution flag and display color.
///
/// The identifier is leased from the run's registry and returned to it when
/// the core is dropped, together with the body.
pub struct AgentCore {
    lease:          IdLease,
    state:          AgentState,
    body:           Box<dyn Body>,
    to_be_executed: bool,
    color:          Color,
}

impl AgentCore {
    /// Lease a fresh identifier from `ctx` and take ownership of `body`.
    ///
    /// If the registry is exhausted the core carries
    /// [`AgentId::UNASSIGNED`]; stores refuse such agents.
    pub fn new(ctx: &MasContext, body: Box<dyn Body>) -> Self {
        Self {
            lease:          ctx.ids().lease_agent(ctx.sink()),
            state:          AgentState::Uninitialized,
            body,
            to_be_executed: false,
            color:          Color::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> AgentId {
        self.lease.id()
    }

    #[inline]
    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn set_state(&mut self, state: AgentState) {
        self.state = state;
    }

    /// Set the state from a raw value.  Returns `false`, leaving the state
    /// untouched, when `raw` is outside the enumeration.
    pub fn set_state_raw(&mut self, raw: u8) -> bool {
        match AgentState::from_raw(raw) {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }

    /// Walk one step of the forward transition table.
    ///
    /// From `Running` the agent becomes `Dead` *and* the call reports
    /// [`TransitionError::NoNextState`]; from `Dead` nothing changes.
    pub fn advance_to_next_logical_state(&mut self) -> Result<AgentState, TransitionError> {
        let (next, outcome) = next_logical_state(self.state.as_raw());
        if let Some(next) = next {
            self.state = next;
        }
        outcome.map(|()| self.state)
    }

    pub fn body(&self) -> &dyn Body {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> &mut dyn Body {
        self.body.as_mut()
    }

    #[inline]
    pub fn is_to_be_executed(&self) -> bool {
        self.to_be_executed
    }

    pub fn set_to_be_executed(&mut self, yes: bool) {
        self.to_be_executed = yes;
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

impl std::fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCore")
            .field("id", &self.id())
            .field("state", &self.state)
            .field("to_be_executed", &self.to_be_executed)
            .finish_non_exhaustive()
    }
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// An autonomous entity driven by a thread agent group.
///
/// Only [`core`](Self::core) and [`core_mut`](Self::core_mut) are required.
/// The lifecycle hooks default to no-ops returning success.
///
/// # Capabilities
///
/// [`location`](Self::location) and [`motion`](Self::motion) advertise the
/// spatial and dynamic capabilities.  They are queried once, when the agent
/// is inserted in an [`AgentStore`](crate::AgentStore), and recorded there.
///
/// # Thread safety
///
/// Groups run on rayon workers, each holding `&mut` to a disjoint batch of
/// agents, so implementations must be `Send`.  No `Sync` is needed.
pub trait Agent: Send {
    fn core(&self) -> &AgentCore;
    fn core_mut(&mut self) -> &mut AgentCore;

    #[inline]
    fn id(&self) -> AgentId {
        self.core().id()
    }

    #[inline]
    fn state(&self) -> AgentState {
        self.core().state()
    }

    /// Called once, on the first activation.
    fn init(&mut self, _ctx: &StepContext) -> AgentResult {
        Ok(())
    }

    /// Called when the agent (re)starts running.
    fn start(&mut self, _ctx: &StepContext) -> AgentResult {
        Ok(())
    }

    /// Called on every activation while running.
    fn exec(&mut self, _ctx: &StepContext) -> AgentResult {
        Ok(())
    }

    /// Idempotent.
    fn stop(&mut self) {
        self.core_mut().set_state(AgentState::Stopped);
    }

    /// Spatial capability: where the agent is, `None` if it has no extent.
    fn location(&self) -> Option<Location> {
        None
    }

    /// Dynamic capability: displacement bookkeeping, `None` if immobile.
    fn motion(&self) -> Option<&Motion> {
        None
    }

    fn motion_mut(&mut self) -> Option<&mut Motion> {
        None
    }

    /// Rendering hook, forwarded to the body.
    fn draw(&self) {
        self.core().body().draw();
    }
}
