//! Safety-gated pump controller.
//!
//! Wraps the pump [`Fsm`] and is the only code that drives the pump relay.
//! Each [`tick`](PumpController::tick):
//!
//! 1. loads the inputs and clock into the FSM context;
//! 2. absorbs millisecond clock wrap;
//! 3. runs one FSM step;
//! 4. emits notifications for what changed;
//! 5. drives the relay: ON iff `Running` and not in service mode.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, PumpActuator};
use crate::config::PumpTiming;
use crate::error::{Result, SafetyFault};
use crate::fsm::context::{FsmContext, PumpInputs, StopReason};
use crate::fsm::{Fsm, StateId, states};
use crate::timing;

pub struct PumpController<A: PumpActuator> {
    fsm: Fsm,
    ctx: FsmContext,
    actuator: A,
    last_run_secs: u32,
}

impl<A: PumpActuator> PumpController<A> {
    /// Take ownership of the relay and start in `Idle` with the pump off.
    pub fn new(mut actuator: A, timing: PumpTiming) -> Self {
        let mut ctx = FsmContext::new(timing);
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);
        actuator.set_pump(false);
        Self {
            fsm,
            ctx,
            actuator,
            last_run_secs: 0,
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn is_locked(&self) -> bool {
        self.state() == StateId::SafetyLocked
    }

    pub fn service_mode(&self) -> bool {
        self.ctx.inputs.service_mode
    }

    /// Duration of the most recent completed run.
    pub fn last_run_secs(&self) -> u32 {
        self.last_run_secs
    }

    pub fn timing(&self) -> PumpTiming {
        self.ctx.timing
    }

    /// New limits take effect on the next tick; a run in progress keeps its
    /// start timestamp.
    pub fn set_timing(&mut self, timing: PumpTiming) {
        self.ctx.timing = timing;
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// The fault holding the lock, if any.
    pub fn fault(&self) -> Option<SafetyFault> {
        if self.is_locked() { self.ctx.latched_fault } else { None }
    }

    /// `Err` while a fault holds the pump off.
    pub fn ensure_unlocked(&self) -> Result<()> {
        match self.fault() {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }

    /// Advance the controller by one step.
    pub fn tick(&mut self, inputs: PumpInputs, now_ms: u32, sink: &mut impl EventSink) -> StateId {
        self.ctx.now_ms = now_ms;
        self.ctx.inputs = inputs;
        self.absorb_clock_wrap(sink);

        let before = self.state();
        self.fsm.tick(&mut self.ctx);
        self.report(before, sink);
        self.apply_actuator();
        self.state()
    }

    /// Clear `SafetyLocked`.  Returns `false` when the pump was not locked.
    pub fn reset_safety_lock(&mut self, now_ms: u32, sink: &mut impl EventSink) -> bool {
        if !self.is_locked() {
            return false;
        }
        self.ctx.now_ms = now_ms;
        self.ctx.latched_fault = None;
        self.fsm.force_transition(StateId::Idle, &mut self.ctx);
        info!("PUMP: safety lock cleared by command");
        self.report(StateId::SafetyLocked, sink);
        sink.emit(&AppEvent::SafetyLockCleared);
        self.apply_actuator();
        true
    }

    // ── Internal ──────────────────────────────────────────────

    fn absorb_clock_wrap(&mut self, sink: &mut impl EventSink) {
        self.ctx.clamp_timestamps();

        if !timing::near_rollover(self.ctx.now_ms) {
            self.ctx.start_hold = false;
            return;
        }
        if !self.ctx.start_hold {
            warn!("PUMP: clock rollover window, start sequencing suspended");
        }
        self.ctx.start_hold = true;

        let state = self.state();
        match state {
            StateId::Running => {
                // A run already past its limit still has to latch the lock.
                if self.ctx.run_elapsed_ms() > self.ctx.timing.work_time_ms {
                    return;
                }
                self.ctx.stop_reason = Some(StopReason::ClockRollover);
                self.fsm.force_transition(StateId::Idle, &mut self.ctx);
                self.report(state, sink);
            }
            StateId::DelayBeforeStart => {
                self.fsm.force_transition(StateId::Idle, &mut self.ctx);
                self.report(state, sink);
            }
            StateId::Idle | StateId::SafetyLocked => {}
        }
        self.ctx.zero_timestamps();
    }

    fn report(&mut self, before: StateId, sink: &mut impl EventSink) {
        let after = self.state();
        if before == after {
            return;
        }
        sink.emit(&AppEvent::StateChanged {
            from: before,
            to: after,
        });

        if before == StateId::Running {
            let ran_ms = self.ctx.last_run_ms.take().unwrap_or(0);
            self.last_run_secs = ran_ms / 1000;
            let reason = self.ctx.stop_reason.take().unwrap_or(StopReason::DryRun);
            sink.emit(&AppEvent::PumpStopped {
                reason,
                ran_secs: self.last_run_secs,
            });
        }
        if after == StateId::SafetyLocked {
            if let Some(fault) = self.ctx.latched_fault {
                sink.emit(&AppEvent::SafetyFault(fault));
            }
        }
    }

    fn apply_actuator(&mut self) {
        let want = self.ctx.pump_on && self.state() == StateId::Running && !self.ctx.inputs.service_mode;
        if want != self.actuator.is_on() {
            self.actuator.set_pump(want);
        }
    }
}
