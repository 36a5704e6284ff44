//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! [`AppEvent`] to the ESP-IDF logger (UART / USB-CDC in production).
//! Telemetry goes out as a JSON object so a serial scraper can parse it.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ConfigSource, EventSink};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started { config, state } => match config {
                ConfigSource::Slot { slot, sequence } => {
                    info!("START | state={:?} | config slot={} seq={}", state, slot, sequence);
                }
                ConfigSource::Defaults => info!("START | state={:?} | config=defaults", state),
            },
            AppEvent::Telemetry(t) => match t.to_json() {
                Ok(json) => info!("TELEM | {}", json),
                Err(e) => warn!("TELEM | encode failed: {}", e),
            },
            AppEvent::MeasurementSkipped => warn!("LEVEL | burst discarded"),
            AppEvent::WaterAlarm(on) => info!("ALARM | water_alarm={}", on),
            AppEvent::WaterReserve(on) => info!("ALARM | water_reserve={}", on),
            AppEvent::WaterSensor(on) => info!("INLET | water_present={}", on),
            AppEvent::StateChanged { from, to } => info!("STATE | {:?} -> {:?}", from, to),
            AppEvent::PumpStopped { reason, ran_secs } => {
                info!("PUMP | stopped after {}s ({:?})", ran_secs, reason);
            }
            AppEvent::SafetyFault(fault) => error!("FAULT | {}", fault),
            AppEvent::SafetyLockCleared => info!("FAULT | lock cleared"),
            AppEvent::ServiceMode(on) => info!("MODE | service={}", on),
            AppEvent::SoundEnabled(on) => info!("MODE | sound={}", on),
            AppEvent::AudibleAlert(reason) => info!("BEEP | {:?}", reason),
            AppEvent::ConfigChanged => info!("CONFIG | changed (unsaved)"),
            AppEvent::ConfigSaved(r) => info!("CONFIG | saved slot={} seq={}", r.slot, r.sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::StateId;

    #[test]
    fn counts_every_event() {
        let mut sink = LogEventSink::new();
        sink.emit(&AppEvent::MeasurementSkipped);
        sink.emit(&AppEvent::StateChanged {
            from: StateId::Idle,
            to: StateId::DelayBeforeStart,
        });
        assert_eq!(sink.emitted(), 2);
    }
}
