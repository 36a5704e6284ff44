//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                       │
//! │  ┌──────────────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ StateId          │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├──────────────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Idle             │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ DelayBeforeStart │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Running          │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ SafetyLocked     │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  └──────────────────┴───────────┴──────────┴───────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick runs `on_update` for the current state; `Some(next)` triggers
//! `on_exit(current)` then `on_enter(next)`.  Handlers share one
//! `&mut FsmContext` carrying the pump inputs, the requested relay state,
//! timing limits and phase timestamps.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Pump controller states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    DelayBeforeStart = 1,
    Running = 2,
    SafetyLocked = 3,
}

impl StateId {
    /// Table size.
    pub const COUNT: usize = 4;
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit` action; runs once per transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick handler: `Some(next)` to leave, `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The pump state machine.
///
/// Owns the state table and the current state; the [`FsmContext`] is passed
/// in on every call so the controller keeps ownership of it.
pub struct Fsm {
    /// Indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: StateId,
    /// Transitions taken since construction.
    transitions: u32,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in {}", self.row(self.current).name);
        if let Some(enter) = self.row(self.current).on_enter {
            enter(ctx);
        }
    }

    /// Run the current state's `on_update` and follow the transition it
    /// asks for, if any.  Returns the state entered.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<StateId> {
        let next = (self.row(self.current).on_update)(ctx)?;
        self.transition(next, ctx);
        Some(next)
    }

    /// Transition from outside the update handlers (lock reset,
    /// clock-rollover abort).  A no-op when already in `next`.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    fn row(&self, id: StateId) -> &StateDescriptor {
        &self.table[id as usize]
    }

    fn transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        info!("FSM transition: {} -> {}", self.row(self.current).name, self.row(next).name);

        if let Some(exit) = self.row(self.current).on_exit {
            exit(ctx);
        }
        self.current = next;
        self.transitions = self.transitions.wrapping_add(1);
        if let Some(enter) = self.row(next).on_enter {
            enter(ctx);
        }
    }
}
