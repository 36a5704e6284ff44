//! Wrapping monotonic time helpers.
//!
//! The firmware runs on two free-running `u32` counters: milliseconds for
//! the pump and orchestrator timers (wraps after ~49.7 days) and
//! microseconds for echo timing (wraps after ~71 minutes).
//!
//! Millisecond timers follow two rules:
//!
//! 1. a stored timestamp that lies in the future is pulled back to `now`;
//! 2. inside the last [`ROLLOVER_GUARD_MS`] before the counter wraps, every
//!    tracked timestamp is zeroed and timed phases are abandoned.
//!
//! Microsecond intervals are short (≤ 25 ms) and use wrapping subtraction.

/// Width of the hold-off window before the millisecond counter wraps.
pub const ROLLOVER_GUARD_MS: u32 = 60_000;

/// A pair of wrapping clock readings taken at the same moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instant {
    /// Milliseconds since boot, wrapping.
    pub ms: u32,
    /// Microseconds since boot, wrapping.
    pub us: u32,
}

impl Instant {
    /// Derive both counters from a 64-bit microsecond uptime.
    pub const fn from_micros(uptime_us: u64) -> Self {
        Self {
            ms: (uptime_us / 1000) as u32,
            us: uptime_us as u32,
        }
    }

    /// Instant with the microsecond counter derived from `ms`.
    pub const fn from_millis(ms: u32) -> Self {
        Self {
            ms,
            us: ms.wrapping_mul(1000),
        }
    }
}

/// `true` once `now_ms` is inside the pre-wrap hold-off window.
pub const fn near_rollover(now_ms: u32) -> bool {
    now_ms > u32::MAX - ROLLOVER_GUARD_MS
}

/// Pull a timestamp that lies in the future back to `now_ms`.
pub fn clamp_to_now(stamp: &mut u32, now_ms: u32) {
    if *stamp > now_ms {
        *stamp = now_ms;
    }
}

/// Milliseconds since `since`, after applying [`clamp_to_now`].
pub fn elapsed_ms(since: &mut u32, now_ms: u32) -> u32 {
    clamp_to_now(since, now_ms);
    now_ms - *since
}

/// Microseconds between two wrapping readings.
pub const fn elapsed_us(since_us: u32, now_us: u32) -> u32 {
    now_us.wrapping_sub(since_us)
}
