//! Unified error types for the HydroSense firmware.
//!
//! Every subsystem converts into the single [`Error`] enum so the control
//! loop handles failures uniformly.  All variants are `Copy`; nothing here
//! allocates.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The ultrasonic ranger rejected a request or produced no data.
    Sensor(SensorError),
    /// Nonvolatile storage could not be read or written.
    Storage(StorageError),
    /// A configuration value was rejected or could not be persisted.
    Config(ConfigError),
    /// The pump is latched off.
    Safety(SafetyFault),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// A finished burst has not been consumed yet.
    ResultPending,
    /// Echo edge did not arrive within the timeout.
    EchoTimeout,
    /// Echo duration maps outside the sensor's usable range.
    OutOfRange,
    /// A trigger or echo GPIO operation failed.
    PinFault,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResultPending => write!(f, "previous burst result not consumed"),
            Self::EchoTimeout => write!(f, "echo timeout"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::PinFault => write!(f, "GPIO fault"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Latched pump faults.  Raising one moves the pump controller into
/// `SafetyLocked`, which only an explicit reset command clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyFault {
    /// The pump ran longer than the configured work time.
    RuntimeLimitExceeded {
        /// How long the pump had been running when it was cut, in seconds.
        ran_secs: u32,
    },
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeLimitExceeded { ran_secs } => {
                write!(f, "pump runtime limit exceeded after {ran_secs}s")
            }
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
