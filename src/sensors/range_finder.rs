//! Non-blocking ultrasonic range finder (HC-SR04 style).
//!
//! A burst fires `K` soundings and reports the median distance.  Nothing
//! here waits on a pin: the cooperative loop calls [`tick`] with the current
//! microsecond counter and the machine advances at most one state per call.
//!
//! ```text
//!  Idle ──start()──▶ TriggerPulse ──10µs──▶ WaitEchoStart ──rise──▶ WaitEchoEnd
//!                         ▲                      │ 25ms                │ fall / 25ms
//!                         │                      ▼                     ▼
//!                         └──── 50ms ──── InterSampleDelay ◀───── sample recorded
//!                                                                      │ K-th
//!                                                                      ▼
//!  Idle ◀──take_result()───────────────────────────────────────────── Done
//! ```
//!
//! [`tick`]: RangingPort::tick

use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use log::{debug, warn};

use crate::app::ports::RangingPort;
use crate::error::SensorError;
use crate::timing::elapsed_us;

/// Upper bound on soundings per burst.
pub const MAX_SOUNDINGS: usize = 8;

/// Slack around the tank's full/empty thresholds when accepting a sounding.
pub const TANK_MARGIN_MM: u32 = 20;

/// Acquisition tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangingConfig {
    /// Soundings per burst (`K`), clamped to `1..=MAX_SOUNDINGS`.
    pub soundings: u8,
    /// Minimum trigger high time.
    pub trigger_pulse_us: u32,
    /// Timeout for each echo edge.
    pub echo_timeout_us: u32,
    /// Quiet time between soundings so stray echoes die out.
    pub settle_us: u32,
    pub speed_of_sound_m_s: u32,
    /// Readings below this are inside the transducer's blind zone.
    pub min_range_mm: u32,
    pub max_range_mm: u32,
}

/// Band of plausible readings for a tank: `[full - margin, empty + margin]`.
pub fn tank_window(full_mm: u16, empty_mm: u16) -> (u32, u32) {
    (
        u32::from(full_mm).saturating_sub(TANK_MARGIN_MM),
        u32::from(empty_mm) + TANK_MARGIN_MM,
    )
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            soundings: 3,
            trigger_pulse_us: 10,
            echo_timeout_us: 25_000,
            settle_us: 50_000,
            speed_of_sound_m_s: 343,
            min_range_mm: 20,
            max_range_mm: 4000,
        }
    }
}

/// Outcome of a single sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSample {
    Distance(u32),
    Invalid(SensorError),
}

impl RawSample {
    pub fn distance(self) -> Option<u32> {
        match self {
            Self::Distance(mm) => Some(mm),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    Idle,
    /// `raised_us` is `None` until the trigger has gone high.
    TriggerPulse { raised_us: Option<u32> },
    WaitEchoStart { since_us: u32 },
    WaitEchoEnd { rise_us: u32 },
    InterSampleDelay { since_us: u32 },
    Done,
}

/// One-way echo time to millimetres.
pub fn echo_to_mm(echo_us: u32, speed_of_sound_m_s: u32) -> u32 {
    (u64::from(echo_us) * u64::from(speed_of_sound_m_s) / 2000) as u32
}

/// Median of the valid samples of a `soundings`-long burst.
///
/// `None` when fewer than `soundings / 2` samples are valid (or none at
/// all).  An even count averages the two middle values.
pub fn burst_median(samples: &[RawSample], soundings: usize) -> Option<u32> {
    let mut valid: Vec<u32, MAX_SOUNDINGS> = samples
        .iter()
        .filter_map(|s| s.distance())
        .take(MAX_SOUNDINGS)
        .collect();
    if valid.is_empty() || valid.len() < soundings / 2 {
        return None;
    }
    valid.sort_unstable();
    let mid = valid.len() / 2;
    if valid.len() % 2 == 1 {
        Some(valid[mid])
    } else {
        Some(((u64::from(valid[mid - 1]) + u64::from(valid[mid])) / 2) as u32)
    }
}

pub struct RangeFinder<T: OutputPin, E: InputPin> {
    trigger: T,
    echo: E,
    config: RangingConfig,
    state: RangeState,
    samples: Vec<RawSample, MAX_SOUNDINGS>,
    median: Option<u32>,
    /// Accepted distances; the sensor range until a tank window is set.
    window: (u32, u32),
}

impl<T: OutputPin, E: InputPin> RangeFinder<T, E> {
    pub fn new(trigger: T, echo: E, mut config: RangingConfig) -> Self {
        config.soundings = config.soundings.clamp(1, MAX_SOUNDINGS as u8);
        Self {
            trigger,
            echo,
            config,
            state: RangeState::Idle,
            samples: Vec::new(),
            median: None,
            window: (config.min_range_mm, config.max_range_mm),
        }
    }

    pub fn state(&self) -> RangeState {
        self.state
    }

    /// Soundings recorded so far in the current burst.
    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    pub fn config(&self) -> &RangingConfig {
        &self.config
    }

    /// Currently accepted `(min, max)` distance.
    pub fn valid_window(&self) -> (u32, u32) {
        self.window
    }

    /// `true` between `start()` and the end of the last sounding.
    pub fn busy(&self) -> bool {
        !matches!(self.state, RangeState::Idle | RangeState::Done)
    }

    fn record(&mut self, sample: RawSample, now_us: u32) {
        debug!("ranging: sounding {} -> {:?}", self.samples.len() + 1, sample);
        // Capacity equals the clamped burst length, so this cannot overflow.
        let _ = self.samples.push(sample);

        if self.samples.len() >= usize::from(self.config.soundings) {
            self.median = burst_median(&self.samples, usize::from(self.config.soundings));
            match self.median {
                Some(mm) => debug!("ranging: burst median {} mm", mm),
                None => warn!(
                    "ranging: burst invalid ({} of {} soundings usable)",
                    self.samples.iter().filter(|s| s.distance().is_some()).count(),
                    self.config.soundings
                ),
            }
            self.state = RangeState::Done;
        } else {
            self.state = RangeState::InterSampleDelay { since_us: now_us };
        }
    }

    fn sample_from_echo(&self, echo_us: u32) -> RawSample {
        let mm = echo_to_mm(echo_us, self.config.speed_of_sound_m_s);
        if (self.window.0..=self.window.1).contains(&mm) {
            RawSample::Distance(mm)
        } else {
            RawSample::Invalid(SensorError::OutOfRange)
        }
    }
}

impl<T: OutputPin, E: InputPin> RangingPort for RangeFinder<T, E> {
    fn start(&mut self) -> Result<(), SensorError> {
        if self.state == RangeState::Done {
            return Err(SensorError::ResultPending);
        }
        if self.busy() {
            debug!("ranging: restart discards {} partial soundings", self.samples.len());
        }
        self.samples.clear();
        self.median = None;
        // A stuck-high trigger from an abandoned burst would mask the next pulse.
        if self.trigger.set_low().is_err() {
            warn!("ranging: trigger pin fault on start");
        }
        self.state = RangeState::TriggerPulse { raised_us: None };
        Ok(())
    }

    fn tick(&mut self, now_us: u32) {
        match self.state {
            RangeState::Idle | RangeState::Done => {}

            RangeState::TriggerPulse { raised_us: None } => {
                if self.trigger.set_high().is_ok() {
                    self.state = RangeState::TriggerPulse {
                        raised_us: Some(now_us),
                    };
                } else {
                    self.record(RawSample::Invalid(SensorError::PinFault), now_us);
                }
            }

            RangeState::TriggerPulse {
                raised_us: Some(raised),
            } => {
                if elapsed_us(raised, now_us) >= self.config.trigger_pulse_us {
                    if self.trigger.set_low().is_ok() {
                        self.state = RangeState::WaitEchoStart { since_us: now_us };
                    } else {
                        self.record(RawSample::Invalid(SensorError::PinFault), now_us);
                    }
                }
            }

            RangeState::WaitEchoStart { since_us } => match self.echo.is_high() {
                Ok(true) => self.state = RangeState::WaitEchoEnd { rise_us: now_us },
                Ok(false) => {
                    if elapsed_us(since_us, now_us) > self.config.echo_timeout_us {
                        self.record(RawSample::Invalid(SensorError::EchoTimeout), now_us);
                    }
                }
                Err(_) => self.record(RawSample::Invalid(SensorError::PinFault), now_us),
            },

            RangeState::WaitEchoEnd { rise_us } => match self.echo.is_high() {
                Ok(false) => {
                    let sample = self.sample_from_echo(elapsed_us(rise_us, now_us));
                    self.record(sample, now_us);
                }
                Ok(true) => {
                    if elapsed_us(rise_us, now_us) > self.config.echo_timeout_us {
                        self.record(RawSample::Invalid(SensorError::EchoTimeout), now_us);
                    }
                }
                Err(_) => self.record(RawSample::Invalid(SensorError::PinFault), now_us),
            },

            RangeState::InterSampleDelay { since_us } => {
                if elapsed_us(since_us, now_us) >= self.config.settle_us {
                    self.state = RangeState::TriggerPulse { raised_us: None };
                }
            }
        }
    }

    fn result_ready(&self) -> bool {
        self.state == RangeState::Done
    }

    fn take_result(&mut self) -> Option<u32> {
        if self.state != RangeState::Done {
            return None;
        }
        self.state = RangeState::Idle;
        self.median.take()
    }

    fn set_valid_window(&mut self, min_mm: u32, max_mm: u32) {
        // Never wider than what the transducer can resolve.
        let min = min_mm.max(self.config.min_range_mm);
        let max = max_mm.min(self.config.max_range_mm);
        debug!("ranging: valid window {}..={} mm", min, max);
        self.window = (min, max);
    }
}
