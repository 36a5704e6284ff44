//! Float switch at the top-off reservoir outlet.
//!
//! The switch pulls its GPIO to ground when it reports water (active-low,
//! internal pull-up).  A read error counts as "no water": the pump
//! controller treats that as a dry-run condition and stops.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::WaterSensorPort;

pub struct FloatSwitch<P: InputPin> {
    pin: P,
    last: bool,
}

impl<P: InputPin> FloatSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, last: false }
    }

    /// Most recent reading without touching the pin.
    pub fn last_reading(&self) -> bool {
        self.last
    }
}

impl<P: InputPin> WaterSensorPort for FloatSwitch<P> {
    fn water_present(&mut self) -> bool {
        self.last = match self.pin.is_low() {
            Ok(low) => low,
            Err(_) => {
                warn!("float switch: GPIO read failed, assuming no water");
                false
            }
        };
        self.last
    }
}
