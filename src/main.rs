//! HydroSense firmware: main entry point.
//!
//! Hexagonal layout with a single cooperative control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  RangeFinder     FloatSwitch      PumpRelay    Esp32Time     │
//! │  (RangingPort)   (WaterSensor)    (Actuator)   (TimePort)    │
//! │  NvsRegion + ConfigStore          LogEventSink + bridge      │
//! │  (StoragePort / ConfigPort)       (EventSink, commands)      │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │             AppService (pure logic)                │      │
//! │  │   LevelFilter · AlarmEngine · PumpController       │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, PinDriver, Pull};
use log::{error, info, warn};

use hydrosense::adapters::bridge::{self, COMMAND_CHANNEL, ChannelEventSink, EVENT_CHANNEL, TeeSink};
use hydrosense::adapters::log_sink::LogEventSink;
use hydrosense::adapters::nvs::{NvsRegion, REGION_CAPACITY};
use hydrosense::adapters::time::Esp32TimeAdapter;
use hydrosense::app::ports::{ConfigPort, ConfigSource, LoadedConfig, TimePort};
use hydrosense::app::service::AppService;
use hydrosense::config::ConfigRecord;
use hydrosense::config_store::ConfigStore;
use hydrosense::drivers::pump::PumpRelay;
use hydrosense::drivers::watchdog::Watchdog;
use hydrosense::pins;
use hydrosense::sensors::level_filter::FilterConfig;
use hydrosense::sensors::range_finder::{RangeFinder, RangingConfig};
use hydrosense::sensors::water_presence::FloatSwitch;

/// Loop period while no burst is in flight.
const IDLE_LOOP_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("HydroSense v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Pins ───────────────────────────────────────────────
    // SAFETY: each GPIO number is claimed exactly once, here.
    let (trigger, echo, float, relay) = unsafe {
        (
            AnyOutputPin::new(pins::RANGE_TRIGGER_GPIO),
            AnyInputPin::new(pins::RANGE_ECHO_GPIO),
            AnyInputPin::new(pins::FLOAT_SWITCH_GPIO),
            AnyOutputPin::new(pins::PUMP_RELAY_GPIO),
        )
    };
    // Relay first so the pump is released before anything else runs.
    let relay = PumpRelay::new(PinDriver::output(relay)?);
    let trigger = PinDriver::output(trigger)?;
    let echo = PinDriver::input(echo)?;
    let mut float_pin = PinDriver::input(float)?;
    float_pin.set_pull(Pull::Up)?;
    let mut float = FloatSwitch::new(float_pin);

    let mut watchdog = Watchdog::new();

    // ── 3. Configuration ──────────────────────────────────────
    let region = match NvsRegion::open(REGION_CAPACITY) {
        Ok(r) => r,
        Err(e) => {
            warn!("NVS open failed ({}), config will not persist this session", e);
            NvsRegion::volatile(REGION_CAPACITY)
        }
    };
    let mut store = ConfigStore::new(region);
    let loaded = store.load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), running on defaults", e);
        LoadedConfig {
            record: ConfigRecord::default(),
            source: ConfigSource::Defaults,
        }
    });

    // ── 4. App service ────────────────────────────────────────
    let ranger = RangeFinder::new(trigger, echo, RangingConfig::default());
    let mut app = AppService::new(loaded.record, ranger, relay, FilterConfig::default());

    let clock = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();
    let mut bridge_sink = ChannelEventSink::new(&EVENT_CHANNEL);
    app.start(
        clock.now(),
        loaded.source,
        &mut TeeSink {
            first: &mut log_sink,
            second: &mut bridge_sink,
        },
    );

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let mut was_locked = false;
    loop {
        let now = clock.now();
        let mut sink = TeeSink {
            first: &mut log_sink,
            second: &mut bridge_sink,
        };

        while let Some(cmd) = bridge::try_recv_command(&COMMAND_CHANNEL) {
            if let Err(e) = app.handle_command(cmd, now.ms, &mut store, &mut sink) {
                warn!("Command {:?} rejected: {}", cmd, e);
            }
        }

        app.tick(now, &mut float, &mut sink);
        watchdog.feed();

        let health = app.health();
        if let Err(e) = health {
            if !was_locked {
                error!("Pump held off: {}", e);
            }
        }
        was_locked = health.is_err();

        // Echo timing needs a tight loop; otherwise yield to FreeRTOS.
        if !app.ranger().busy() {
            FreeRtos::delay_ms(IDLE_LOOP_MS);
        }
    }
}
