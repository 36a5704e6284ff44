//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the configuration, the level filter, the alarm
//! engine and the pump controller, and drives the ranger through its port.
//! It is called from the cooperative main loop many times per second;
//! every call returns within microseconds.
//!
//! ```text
//!  RangingPort ─────▶ ┌───────────────────────────────┐ ──▶ EventSink
//!  WaterSensorPort ──▶│          AppService           │
//!  AppCommand ───────▶│ LevelFilter · Alarms · Pump   │ ──▶ PumpActuator
//!  ConfigPort ◀──────▶└───────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::alarm::{AlarmEngine, AlarmState};
use crate::config::ConfigRecord;
use crate::control::pump::PumpController;
use crate::error::Result;
use crate::fsm::StateId;
use crate::fsm::context::PumpInputs;
use crate::sensors::level_filter::{self, FilterConfig, LevelFilter};
use crate::sensors::range_finder::tank_window;
use crate::timing::{self, Instant};

use super::commands::AppCommand;
use super::events::{AlertReason, AppEvent, TelemetryData};
use super::ports::{ConfigPort, ConfigSource, EventSink, PumpActuator, RangingPort, WaterSensorPort};

/// Interval between audible reminders while locked or in service mode.
pub const ALERT_INTERVAL_MS: u32 = 60_000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<R: RangingPort, A: PumpActuator> {
    config: ConfigRecord,
    ranger: R,
    filter: LevelFilter,
    alarms: AlarmEngine,
    pump: PumpController<A>,
    service_mode: bool,
    water_present: bool,
    measured_once: bool,
    last_measurement_ms: u32,
    last_alert_ms: u32,
    tick_count: u64,
    config_dirty: bool,
}

impl<R: RangingPort, A: PumpActuator> AppService<R, A> {
    /// Construct the service.  The pump starts `Idle` with the relay off.
    ///
    /// Call [`start`](Self::start) before the first [`tick`](Self::tick).
    pub fn new(config: ConfigRecord, ranger: R, actuator: A, filter: FilterConfig) -> Self {
        let pump = PumpController::new(actuator, config.pump_timing());
        let mut app = Self {
            config,
            ranger,
            filter: LevelFilter::new(filter),
            alarms: AlarmEngine::new(),
            pump,
            service_mode: false,
            water_present: false,
            measured_once: false,
            last_measurement_ms: 0,
            last_alert_ms: 0,
            tick_count: 0,
            config_dirty: false,
        };
        app.push_valid_window();
        app
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce startup and fire the first ranging burst.
    pub fn start(&mut self, now: Instant, source: ConfigSource, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            config: source,
            state: self.pump.state(),
        });
        info!("AppService started ({:?})", source);
        self.begin_measurement(now.ms);
        self.last_alert_ms = now.ms;
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One pass of the cooperative loop.
    ///
    /// Reads the float switch, advances the ranger, consumes a finished
    /// burst, steps the pump controller, and schedules the next burst and
    /// audible reminder.
    pub fn tick(&mut self, now: Instant, water: &mut impl WaterSensorPort, sink: &mut impl EventSink) {
        self.tick_count += 1;
        timing::clamp_to_now(&mut self.last_measurement_ms, now.ms);
        timing::clamp_to_now(&mut self.last_alert_ms, now.ms);

        // 1. Float switch
        let present = water.water_present();
        if present != self.water_present {
            self.water_present = present;
            info!("Water sensor: {}", if present { "WATER" } else { "DRY" });
            sink.emit(&AppEvent::WaterSensor(present));
        }

        // 2. Ranging
        self.ranger.tick(now.us);
        if self.ranger.result_ready() {
            let median = self.ranger.take_result();
            self.on_burst(median, sink);
        }

        // 3. Pump
        self.step_pump(now.ms, sink);

        // 4. Next burst
        if timing::elapsed_ms(&mut self.last_measurement_ms, now.ms) >= self.config.measurement_interval_ms() {
            self.begin_measurement(now.ms);
        }

        // 5. Audible reminder
        self.check_alert(now.ms, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    ///
    /// Configuration edits are validated before they touch the live record;
    /// a rejected edit leaves everything unchanged and returns the error.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::SetServiceMode(on) => self.set_service_mode(on, now_ms, sink),
            AppCommand::ToggleServiceMode => self.set_service_mode(!self.service_mode, now_ms, sink),
            AppCommand::ResetSafetyLock => {
                if !self.pump.reset_safety_lock(now_ms, sink) {
                    info!("Safety reset requested but pump is not locked");
                }
            }
            AppCommand::SetSoundEnabled(on) => {
                self.edit(|c| c.apply(crate::config::ConfigField::SoundEnabled(on)), sink)?;
                sink.emit(&AppEvent::SoundEnabled(on));
            }
            AppCommand::SetField(field) => self.edit(|c| c.apply(field), sink)?,
            AppCommand::ReplaceConfig(record) => {
                self.edit(
                    |c| {
                        record.validate()?;
                        *c = record;
                        Ok(())
                    },
                    sink,
                )?;
            }
            AppCommand::SaveConfig => self.save(store, sink)?,
            AppCommand::FactoryReset => {
                warn!("Factory reset: restoring default configuration");
                self.edit(
                    |c| {
                        *c = ConfigRecord::default();
                        Ok(())
                    },
                    sink,
                )?;
                self.save(store, sink)?;
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot of the current readings; `None` before the first valid burst.
    pub fn telemetry(&self) -> Option<TelemetryData> {
        let distance = self.filter.distance_mm()?;
        let tank = self.config.thresholds();
        let alarms = self.alarms.state();
        Some(TelemetryData {
            distance_mm: distance,
            level_percent: level_filter::level_percent(distance, &tank),
            volume_liters: level_filter::volume_liters(distance, &tank),
            water_alarm: alarms.water_alarm_active,
            water_reserve: alarms.water_reserve_active,
            water_present: self.water_present,
            pump_state: self.pump.state(),
            service_mode: self.service_mode,
            safety_locked: self.pump.is_locked(),
            sound_enabled: self.config.sound_enabled,
            last_run_secs: self.pump.last_run_secs(),
        })
    }

    /// Current pump state.
    pub fn state(&self) -> StateId {
        self.pump.state()
    }

    pub fn alarms(&self) -> AlarmState {
        self.alarms.state()
    }

    pub fn config(&self) -> &ConfigRecord {
        &self.config
    }

    pub fn service_mode(&self) -> bool {
        self.service_mode
    }

    /// `Err(Error::Safety)` while the pump is latched off.
    pub fn health(&self) -> Result<()> {
        self.pump.ensure_unlocked()
    }

    pub fn pump(&self) -> &PumpController<A> {
        &self.pump
    }

    pub fn ranger(&self) -> &R {
        &self.ranger
    }

    /// Total loop passes since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_measurement(&mut self, now_ms: u32) {
        self.last_measurement_ms = now_ms;
        if let Err(e) = self.ranger.start() {
            warn!("Ranging not started: {}", e);
        }
    }

    fn on_burst(&mut self, median: Option<u32>, sink: &mut impl EventSink) {
        let Some(mm) = median else {
            warn!("Measurement skipped: not enough valid soundings");
            sink.emit(&AppEvent::MeasurementSkipped);
            return;
        };

        let tank = self.config.thresholds();
        let distance = self.filter.update(mm, &tank);
        let changes = self.alarms.evaluate(distance, &tank);
        let alarms = self.alarms.state();

        if !self.measured_once {
            // The first reading publishes both flags so subscribers start in sync.
            self.measured_once = true;
            sink.emit(&AppEvent::WaterAlarm(alarms.water_alarm_active));
            sink.emit(&AppEvent::WaterReserve(alarms.water_reserve_active));
        } else {
            if let Some(on) = changes.water_alarm {
                sink.emit(&AppEvent::WaterAlarm(on));
            }
            if let Some(on) = changes.water_reserve {
                sink.emit(&AppEvent::WaterReserve(on));
            }
        }

        if let Some(t) = self.telemetry() {
            sink.emit(&AppEvent::Telemetry(t));
        }
    }

    fn step_pump(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let inputs = PumpInputs {
            water_present: self.water_present,
            water_alarm_active: self.alarms.state().water_alarm_active,
            service_mode: self.service_mode,
        };
        self.pump.tick(inputs, now_ms, sink);
    }

    fn set_service_mode(&mut self, on: bool, now_ms: u32, sink: &mut impl EventSink) {
        if on == self.service_mode {
            return;
        }
        self.service_mode = on;
        info!("Service mode {}", if on { "ON" } else { "OFF" });
        sink.emit(&AppEvent::ServiceMode(on));
        // Apply right away so the relay never outlives the override.
        self.step_pump(now_ms, sink);
        if on {
            self.last_alert_ms = now_ms;
        }
    }

    fn check_alert(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let reason = if self.pump.is_locked() {
            AlertReason::SafetyLocked
        } else if self.service_mode {
            AlertReason::ServiceMode
        } else {
            return;
        };
        if !self.config.sound_enabled {
            return;
        }
        if timing::elapsed_ms(&mut self.last_alert_ms, now_ms) >= ALERT_INTERVAL_MS {
            self.last_alert_ms = now_ms;
            debug!("Audible reminder: {:?}", reason);
            sink.emit(&AppEvent::AudibleAlert(reason));
        }
    }

    /// Run a validated mutation against a copy of the config and adopt it.
    fn edit(
        &mut self,
        f: impl FnOnce(&mut ConfigRecord) -> core::result::Result<(), super::ports::ConfigError>,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let mut next = self.config;
        f(&mut next)?;
        if next == self.config {
            return Ok(());
        }

        let recalibrated = next.thresholds() != self.config.thresholds();
        self.pump.set_timing(next.pump_timing());
        self.config = next;
        if recalibrated {
            // Old smoothing history is meaningless against new calibration.
            self.filter.reset();
            self.push_valid_window();
        }
        self.config_dirty = true;
        info!("Configuration updated at runtime");
        sink.emit(&AppEvent::ConfigChanged);
        Ok(())
    }

    fn push_valid_window(&mut self) {
        let tank = self.config.thresholds();
        let (min, max) = tank_window(tank.full_mm, tank.empty_mm);
        self.ranger.set_valid_window(min, max);
    }

    fn save(&mut self, store: &mut impl ConfigPort, sink: &mut impl EventSink) -> Result<()> {
        let receipt = store.save(&self.config)?;
        self.config_dirty = false;
        sink.emit(&AppEvent::ConfigSaved(receipt));
        Ok(())
    }
}
