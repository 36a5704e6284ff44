//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: the current inputs, the requested relay state, pump timing
//! limits, and the timestamps of the current phase.  The pump controller
//! fills the inputs before each tick and applies `pump_on` after it.

use crate::config::PumpTiming;
use crate::error::SafetyFault;
use crate::timing;

// ---------------------------------------------------------------------------
// Inputs (read-only to state handlers; written by the pump controller)
// ---------------------------------------------------------------------------

/// Everything the pump logic looks at on a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpInputs {
    /// Float switch reports water.
    pub water_present: bool,
    /// Tank reached its empty threshold (hysteresis applied).
    pub water_alarm_active: bool,
    /// Manual override: pump forced off while set.
    pub service_mode: bool,
}

/// Why a running pump was switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum StopReason {
    ServiceMode,
    RuntimeLimit,
    WaterAlarm,
    DryRun,
    /// Run abandoned ahead of a millisecond counter wrap.
    ClockRollover,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
#[derive(Debug)]
pub struct FsmContext {
    /// Millisecond clock for this tick.
    pub now_ms: u32,

    // -- Inputs --
    pub inputs: PumpInputs,

    // -- Output --
    /// Requested relay state, applied by the controller after the tick.
    pub pump_on: bool,

    // -- Limits --
    pub timing: PumpTiming,

    // -- Phase timestamps (ms) --
    pub delay_start_ms: u32,
    pub run_start_ms: u32,
    /// Start sequencing suspended until the clock wraps.
    pub start_hold: bool,

    // -- Outcomes, taken by the controller after each tick --
    /// Set when the runtime limit latches the lock.
    pub latched_fault: Option<SafetyFault>,
    /// Set when a run ends.
    pub stop_reason: Option<StopReason>,
    /// Duration of the run that just ended.
    pub last_run_ms: Option<u32>,
}

impl FsmContext {
    pub fn new(timing: PumpTiming) -> Self {
        Self {
            now_ms: 0,
            inputs: PumpInputs::default(),
            pump_on: false,
            timing,
            delay_start_ms: 0,
            run_start_ms: 0,
            start_hold: false,
            latched_fault: None,
            stop_reason: None,
            last_run_ms: None,
        }
    }

    /// Milliseconds spent waiting in `DelayBeforeStart`.
    pub fn delay_elapsed_ms(&mut self) -> u32 {
        timing::elapsed_ms(&mut self.delay_start_ms, self.now_ms)
    }

    /// Milliseconds the pump has been running.
    pub fn run_elapsed_ms(&mut self) -> u32 {
        timing::elapsed_ms(&mut self.run_start_ms, self.now_ms)
    }

    /// Apply the "never in the future" rule to both phase timestamps.
    pub fn clamp_timestamps(&mut self) {
        timing::clamp_to_now(&mut self.delay_start_ms, self.now_ms);
        timing::clamp_to_now(&mut self.run_start_ms, self.now_ms);
    }

    /// Forget both phase timestamps.
    pub fn zero_timestamps(&mut self) {
        self.delay_start_ms = 0;
        self.run_start_ms = 0;
    }
}
