//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[water present]──▶ DELAY_BEFORE_START ──[delay elapsed]──▶ RUNNING
//!    ▲                              │                                  │
//!    └──[service / alarm / dry]─────┘                                  │
//!    ▲                                                                 │
//!    └──────────────[service / alarm / dry]────────────────────────────┤
//!                                                                      │
//!                                               [run > work time]      ▼
//!                                                             SAFETY_LOCKED
//!                                                   (left only by explicit reset)
//! ```
//!
//! Within every update handler the checks run in a fixed priority order:
//! service override, runtime limit, water-alarm gate, dry-run, then start
//! sequencing.
//!
//! The start delay is abandoned, not paused: an alarm, service mode or a
//! dry inlet during `DELAY_BEFORE_START` drops back to `IDLE`, and the full
//! delay runs again once the inputs allow a start.

use super::context::{FsmContext, StopReason};
use super::{StateDescriptor, StateId};
use crate::error::SafetyFault;
use log::{error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: DelayBeforeStart
        StateDescriptor {
            id: StateId::DelayBeforeStart,
            name: "DelayBeforeStart",
            on_enter: Some(delay_enter),
            on_exit: None,
            on_update: delay_update,
        },
        // Index 2: Running
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: Some(running_exit),
            on_update: running_update,
        },
        // Index 3: SafetyLocked
        StateDescriptor {
            id: StateId::SafetyLocked,
            name: "SafetyLocked",
            on_enter: Some(locked_enter),
            on_exit: None,
            on_update: locked_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.pump_on = false;
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    let inputs = ctx.inputs;
    if inputs.service_mode || ctx.start_hold || inputs.water_alarm_active {
        return None;
    }
    if inputs.water_present {
        return Some(StateId::DelayBeforeStart);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DELAY_BEFORE_START: water must stay present for the whole delay
// ═══════════════════════════════════════════════════════════════════════════

fn delay_enter(ctx: &mut FsmContext) {
    ctx.delay_start_ms = ctx.now_ms;
    info!(
        "PUMP: water detected, starting in {} ms",
        ctx.timing.delay_ms
    );
}

fn delay_update(ctx: &mut FsmContext) -> Option<StateId> {
    let inputs = ctx.inputs;
    if inputs.service_mode || inputs.water_alarm_active {
        return Some(StateId::Idle);
    }
    if !inputs.water_present {
        info!("PUMP: water gone before start, delay cancelled");
        return Some(StateId::Idle);
    }
    if ctx.start_hold {
        return Some(StateId::Idle);
    }
    if ctx.delay_elapsed_ms() >= ctx.timing.delay_ms {
        return Some(StateId::Running);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut FsmContext) {
    ctx.run_start_ms = ctx.now_ms;
    ctx.pump_on = true;
    ctx.stop_reason = None;
    info!("PUMP: ON (limit {} ms)", ctx.timing.work_time_ms);
}

fn running_exit(ctx: &mut FsmContext) {
    ctx.pump_on = false;
    let ran = ctx.run_elapsed_ms();
    ctx.last_run_ms = Some(ran);
    info!("PUMP: OFF after {} ms ({:?})", ran, ctx.stop_reason);
}

fn running_update(ctx: &mut FsmContext) -> Option<StateId> {
    let inputs = ctx.inputs;

    if inputs.service_mode {
        ctx.stop_reason = Some(StopReason::ServiceMode);
        return Some(StateId::Idle);
    }

    let ran = ctx.run_elapsed_ms();
    if ran > ctx.timing.work_time_ms {
        ctx.stop_reason = Some(StopReason::RuntimeLimit);
        ctx.latched_fault = Some(SafetyFault::RuntimeLimitExceeded {
            ran_secs: ran / 1000,
        });
        return Some(StateId::SafetyLocked);
    }

    if inputs.water_alarm_active {
        warn!("PUMP: water alarm while running");
        ctx.stop_reason = Some(StopReason::WaterAlarm);
        return Some(StateId::Idle);
    }

    if !inputs.water_present {
        ctx.stop_reason = Some(StopReason::DryRun);
        return Some(StateId::Idle);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SAFETY_LOCKED: absorbing until an explicit reset
// ═══════════════════════════════════════════════════════════════════════════

fn locked_enter(ctx: &mut FsmContext) {
    ctx.pump_on = false;
    match ctx.latched_fault {
        Some(fault) => error!("SAFETY LOCK: {fault}"),
        None => error!("SAFETY LOCK engaged"),
    }
}

fn locked_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}
