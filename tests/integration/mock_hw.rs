//! Mock hardware for integration tests.
//!
//! A simulated ultrasonic transducer sits behind real `embedded-hal` pins so
//! the production `RangeFinder`, `FloatSwitch` and `PumpRelay` run unchanged
//! against a virtual clock.  [`Rig`] wires them into an `AppService` backed
//! by an in-memory NVS region.

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use hydrosense::adapters::nvs::NvsRegion;
use hydrosense::app::commands::AppCommand;
use hydrosense::app::events::AppEvent;
use hydrosense::app::ports::{ConfigPort, ConfigSource, EventSink};
use hydrosense::app::service::AppService;
use hydrosense::config::ConfigRecord;
use hydrosense::config_store::{ConfigStore, REGION_LEN};
use hydrosense::drivers::pump::PumpRelay;
use hydrosense::sensors::level_filter::FilterConfig;
use hydrosense::sensors::range_finder::{RangeFinder, RangingConfig};
use hydrosense::sensors::water_presence::FloatSwitch;
use hydrosense::timing::Instant;

/// Gap between the trigger's falling edge and the echo's rising edge.
pub const ECHO_LATENCY_US: u32 = 100;

/// Loop step while a burst is in flight.
pub const BURST_STEP_US: u64 = 5;

/// Loop step otherwise.
pub const IDLE_STEP_US: u64 = 1_000;

// ── Simulated transducer ──────────────────────────────────────

#[derive(Debug, Default)]
pub struct Sonar {
    pub now_us: u32,
    /// Distance to the water surface; `None` = no echo at all.
    pub target_mm: Option<u32>,
    /// `(rise_us, width_us)` of the pending echo.
    echo: Option<(u32, u32)>,
    trigger_high: bool,
    pub pulses: u32,
}

/// Echo width that maps back to exactly `mm` at 343 m/s.
pub fn echo_width_us(mm: u32) -> u32 {
    (mm * 2000).div_ceil(343)
}

#[derive(Clone, Default)]
pub struct SonarHandle(pub Rc<RefCell<Sonar>>);

impl SonarHandle {
    pub fn set_now(&self, now_us: u32) {
        self.0.borrow_mut().now_us = now_us;
    }

    pub fn set_target(&self, mm: Option<u32>) {
        self.0.borrow_mut().target_mm = mm;
    }

    pub fn pulses(&self) -> u32 {
        self.0.borrow().pulses
    }
}

pub struct SimTrigger(pub SonarHandle);
pub struct SimEcho(pub SonarHandle);

impl ErrorType for SimTrigger {
    type Error = Infallible;
}

impl OutputPin for SimTrigger {
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.0.borrow_mut().trigger_high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut s = self.0.0.borrow_mut();
        if s.trigger_high {
            s.pulses += 1;
            let rise = s.now_us.wrapping_add(ECHO_LATENCY_US);
            let echo = s.target_mm.map(|mm| (rise, echo_width_us(mm)));
            s.echo = echo;
        }
        s.trigger_high = false;
        Ok(())
    }
}

impl ErrorType for SimEcho {
    type Error = Infallible;
}

impl InputPin for SimEcho {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let s = self.0.0.borrow();
        Ok(match s.echo {
            Some((rise, width)) => s.now_us.wrapping_sub(rise) < width,
            None => false,
        })
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

// ── Float switch and relay pins ───────────────────────────────

/// Active-low float contact: reads LOW while `water` is set.
pub struct SimFloatPin(pub Rc<Cell<bool>>);

impl ErrorType for SimFloatPin {
    type Error = Infallible;
}

impl InputPin for SimFloatPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }
}

/// Relay coil that records every level written to it.
pub struct SimCoil(pub Rc<RefCell<Vec<bool>>>);

impl ErrorType for SimCoil {
    type Error = Infallible;
}

impl OutputPin for SimCoil {
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().push(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().push(false);
        Ok(())
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Full rig ──────────────────────────────────────────────────

pub type RigApp = AppService<RangeFinder<SimTrigger, SimEcho>, PumpRelay<SimCoil>>;

pub struct Rig {
    pub app: RigApp,
    pub sonar: SonarHandle,
    pub water: Rc<Cell<bool>>,
    pub coil: Rc<RefCell<Vec<bool>>>,
    pub float: FloatSwitch<SimFloatPin>,
    pub store: ConfigStore<NvsRegion>,
    pub sink: RecordingSink,
    pub source: ConfigSource,
    now_us: u64,
}

#[allow(dead_code)]
impl Rig {
    /// Boot on a blank region.
    pub fn new() -> Self {
        Self::boot(NvsRegion::in_memory(REGION_LEN), 0)
    }

    /// Boot from `region` with the clock at `start_us`, the way `main` does.
    pub fn boot(region: NvsRegion, start_us: u64) -> Self {
        let mut store = ConfigStore::new(region);
        let loaded = store.load().unwrap();
        Self::with_config(loaded.record, store, loaded.source, start_us)
    }

    pub fn with_config(
        config: ConfigRecord,
        store: ConfigStore<NvsRegion>,
        source: ConfigSource,
        start_us: u64,
    ) -> Self {
        let sonar = SonarHandle::default();
        let water = Rc::new(Cell::new(false));
        let coil = Rc::new(RefCell::new(Vec::new()));
        let ranger = RangeFinder::new(
            SimTrigger(sonar.clone()),
            SimEcho(sonar.clone()),
            RangingConfig::default(),
        );
        let relay = PumpRelay::new(SimCoil(coil.clone()));
        let app = AppService::new(config, ranger, relay, FilterConfig::default());

        let mut rig = Self {
            app,
            sonar,
            water: water.clone(),
            coil,
            float: FloatSwitch::new(SimFloatPin(water)),
            store,
            sink: RecordingSink::default(),
            source,
            now_us: start_us,
        };
        rig.sonar.set_now(rig.now().us);
        let now = rig.now();
        rig.app.start(now, source, &mut rig.sink);
        rig
    }

    pub fn now(&self) -> Instant {
        Instant::from_micros(self.now_us)
    }

    pub fn now_ms(&self) -> u64 {
        self.now_us / 1000
    }

    /// One loop pass, then advance the clock.
    pub fn step(&mut self) {
        let now = self.now();
        self.sonar.set_now(now.us);
        self.app.tick(now, &mut self.float, &mut self.sink);
        self.now_us += if self.app.ranger().busy() {
            BURST_STEP_US
        } else {
            IDLE_STEP_US
        };
    }

    /// Run the loop until the clock reaches `ms` since boot of the rig clock.
    pub fn run_until_ms(&mut self, ms: u64) {
        while self.now_us < ms * 1000 {
            self.step();
        }
    }

    pub fn run_for_ms(&mut self, ms: u64) {
        let target = self.now_ms() + ms;
        self.run_until_ms(target);
    }

    pub fn command(&mut self, cmd: AppCommand) -> hydrosense::error::Result<()> {
        let now_ms = self.now().ms;
        self.app
            .handle_command(cmd, now_ms, &mut self.store, &mut self.sink)
    }

    pub fn set_surface(&self, mm: Option<u32>) {
        self.sonar.set_target(mm);
    }

    pub fn set_water(&self, present: bool) {
        self.water.set(present);
    }

    pub fn pump_on(&self) -> bool {
        self.coil.borrow().last().copied().unwrap_or(false)
    }

    /// Hand the storage back, e.g. to reboot from it.
    pub fn into_region(self) -> NvsRegion {
        self.store.into_inner()
    }
}
