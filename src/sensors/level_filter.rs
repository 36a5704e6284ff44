//! Slew-limited exponential smoothing of burst medians, plus the derived
//! level percentage and stored volume.

use log::debug;

use crate::config::TankThresholds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// EMA weight of the new (slew-limited) reading.
    pub alpha: f32,
    /// Largest change a single reading may contribute before smoothing (mm).
    pub max_step_mm: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            max_step_mm: 10.0,
        }
    }
}

/// Owns the filtered distance.  Only [`update`](Self::update) changes it.
#[derive(Debug, Clone)]
pub struct LevelFilter {
    config: FilterConfig,
    last: Option<f32>,
}

impl LevelFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config, last: None }
    }

    /// Feed one burst median; returns the new filtered distance.
    ///
    /// The first reading seeds the filter directly.  After that the step
    /// toward the new reading is limited to `±max_step_mm`, smoothed with
    /// `alpha`, and the result is kept inside the tank range.
    pub fn update(&mut self, median_mm: u32, tank: &TankThresholds) -> f32 {
        let raw = median_mm as f32;
        let next = match self.last {
            None => raw,
            Some(prev) => {
                let step = (raw - prev).clamp(-self.config.max_step_mm, self.config.max_step_mm);
                let limited = prev + step;
                self.config.alpha * limited + (1.0 - self.config.alpha) * prev
            }
        };
        let filtered = clamp_to_tank(next, tank);
        debug!("level: median {} mm -> filtered {:.1} mm", median_mm, filtered);
        self.last = Some(filtered);
        filtered
    }

    /// Latest filtered distance, `None` before the first reading.
    pub fn distance_mm(&self) -> Option<f32> {
        self.last
    }

    /// Forget history; the next reading seeds the filter again.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

fn clamp_to_tank(distance_mm: f32, tank: &TankThresholds) -> f32 {
    distance_mm.clamp(f32::from(tank.full_mm), f32::from(tank.empty_mm))
}

/// Keeps exact whole percentages (590/1000 -> 59) from truncating one low.
const PERCENT_EPSILON: f32 = 1e-3;

/// Fill level in percent: 100 at `full`, 0 at `empty`, truncated.
pub fn level_percent(distance_mm: f32, tank: &TankThresholds) -> u8 {
    let full = f32::from(tank.full_mm);
    let empty = f32::from(tank.empty_mm);
    let span = empty - full;
    if span <= 0.0 {
        return 0;
    }
    let d = distance_mm.clamp(full, empty);
    ((empty - d) / span * 100.0 + PERCENT_EPSILON).min(100.0) as u8
}

/// Water volume in litres for a cylindrical tank.
pub fn volume_liters(distance_mm: f32, tank: &TankThresholds) -> f32 {
    let full = f32::from(tank.full_mm);
    let empty = f32::from(tank.empty_mm);
    let height = (empty - distance_mm).clamp(0.0, (empty - full).max(0.0));
    let radius = f32::from(tank.diameter_mm) / 2.0;
    core::f32::consts::PI * radius * radius * height / 1_000_000.0
}
