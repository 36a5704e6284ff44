//! Water alarm and reserve warning with hysteresis.
//!
//! Each flag switches ON when the filtered distance reaches its threshold
//! and OFF only once the distance drops below `threshold - hysteresis`.
//! The dead band in between keeps the flags from chattering while the
//! surface ripples around a threshold.
//!
//! ```text
//!  distance ─────────────────────────────────────────▶ (larger = emptier)
//!            OFF      │  dead band (hold)   │   ON
//!                threshold - hyst       threshold
//! ```

use log::{info, warn};

use crate::config::TankThresholds;

/// One hysteresis step.  Pure and idempotent.
pub fn hysteresis_step(active: bool, distance_mm: f32, threshold_mm: u16, hysteresis_mm: u16) -> bool {
    let on_at = f32::from(threshold_mm);
    let off_below = on_at - f32::from(hysteresis_mm);
    if distance_mm >= on_at {
        true
    } else if distance_mm < off_below {
        false
    } else {
        active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmState {
    /// Tank at or beyond its empty threshold.
    pub water_alarm_active: bool,
    /// Tank at or beyond its reserve threshold.
    pub water_reserve_active: bool,
}

/// Which flags flipped during an [`AlarmEngine::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmChanges {
    pub water_alarm: Option<bool>,
    pub water_reserve: Option<bool>,
}

impl AlarmChanges {
    pub fn any(&self) -> bool {
        self.water_alarm.is_some() || self.water_reserve.is_some()
    }
}

#[derive(Debug, Default)]
pub struct AlarmEngine {
    state: AlarmState,
}

impl AlarmEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Re-evaluate both flags against a new filtered distance.
    pub fn evaluate(&mut self, distance_mm: f32, tank: &TankThresholds) -> AlarmChanges {
        let alarm = hysteresis_step(
            self.state.water_alarm_active,
            distance_mm,
            tank.empty_mm,
            tank.hysteresis_mm,
        );
        let reserve = hysteresis_step(
            self.state.water_reserve_active,
            distance_mm,
            tank.reserve_mm,
            tank.hysteresis_mm,
        );

        let mut changes = AlarmChanges::default();
        if alarm != self.state.water_alarm_active {
            if alarm {
                warn!("ALARM SET: water alarm at {:.0} mm", distance_mm);
            } else {
                info!("ALARM CLEARED: water alarm at {:.0} mm", distance_mm);
            }
            changes.water_alarm = Some(alarm);
        }
        if reserve != self.state.water_reserve_active {
            info!(
                "RESERVE {}: {:.0} mm",
                if reserve { "SET" } else { "CLEARED" },
                distance_mm
            );
            changes.water_reserve = Some(reserve);
        }

        self.state = AlarmState {
            water_alarm_active: alarm,
            water_reserve_active: reserve,
        };
        changes
    }
}
