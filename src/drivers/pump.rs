//! Top-off pump relay driver.
//!
//! A single GPIO drives the relay coil (active-high).  This driver is a dumb
//! actuator: the pump controller decides when it runs and is the only
//! caller.  `is_on()` tracks the last level that was actually written, so a
//! failed write leaves the old level reported and the controller retries it
//! on its next step.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::digital::OutputPin`: an `esp-idf-hal`
//! `PinDriver` on the device, a recording mock on the host.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::PumpActuator;

pub struct PumpRelay<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> PumpRelay<P> {
    /// Take the pin and drive it low so the pump starts released.
    pub fn new(mut pin: P) -> Self {
        // Unknown level until a release lands; report on so it gets retried.
        let on = pin.set_low().is_err();
        if on {
            error!("pump relay: failed to release on init");
        }
        Self { pin, on }
    }
}

impl<P: OutputPin> PumpActuator for PumpRelay<P> {
    fn set_pump(&mut self, on: bool) {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        match res {
            Ok(()) => self.on = on,
            Err(_) => error!("pump relay: GPIO write failed (requested {})", if on { "ON" } else { "OFF" }),
        }
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
