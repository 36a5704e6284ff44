//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (float switch, pump relay, ranger, clock, storage, event
//! sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics, so
//! the domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **PumpActuator** has exactly one owner, the pump controller.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **EventSink** implementations MUST NOT block the control loop.

use crate::config::ConfigRecord;
use crate::timing::Instant;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Float switch next to the tank outlet.
pub trait WaterSensorPort {
    /// `true` when the switch reports water.
    fn water_present(&mut self) -> bool;
}

/// Non-blocking distance acquisition.
///
/// A burst is started with [`start`](Self::start), advanced by
/// [`tick`](Self::tick) from the cooperative loop, and collected with
/// [`take_result`](Self::take_result) once [`result_ready`](Self::result_ready).
pub trait RangingPort {
    /// Begin a new burst.  Fails while a finished result is unconsumed.
    fn start(&mut self) -> Result<(), crate::error::SensorError>;

    /// Advance the acquisition by at most one step.  Never blocks.
    fn tick(&mut self, now_us: u32);

    /// `true` once a finished burst is waiting to be taken.
    fn result_ready(&self) -> bool;

    /// Consume the finished burst.  `Some(mm)` is the median distance;
    /// `None` means too few soundings succeeded.
    fn take_result(&mut self) -> Option<u32>;

    /// Accept only soundings within `[min_mm, max_mm]` from the next one on.
    fn set_valid_window(&mut self, min_mm: u32, max_mm: u32);
}

/// Wrapping monotonic clock.
pub trait TimePort {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Pump relay.
pub trait PumpActuator {
    /// Energise (`true`) or release (`false`) the pump.
    fn set_pump(&mut self, on: bool);

    /// Last commanded state.
    fn is_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, the
/// network bridge channel, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from the slot at `slot`, written with sequence `sequence`.
    Slot { slot: usize, sequence: u32 },
    /// No readable slot; factory defaults were persisted.
    Defaults,
}

/// Result of a successful [`ConfigPort::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedConfig {
    pub record: ConfigRecord,
    pub source: ConfigSource,
}

/// Where a saved record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReceipt {
    pub slot: usize,
    pub sequence: u32,
}

/// Loads and persists the controller configuration.
///
/// Implementations MUST reject invalid records with
/// [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Load the newest readable record, falling back to persisted defaults.
    fn load(&mut self) -> Result<LoadedConfig, ConfigError>;

    /// Validate and persist a record.
    fn save(&mut self, record: &ConfigRecord) -> Result<SaveReceipt, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ EEPROM-style region)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable nonvolatile region.
///
/// Writes land in the backend's working copy; [`commit`](Self::commit) makes
/// them durable.  A power loss between `write` and the end of `commit` may
/// corrupt any byte that was being written, but never bytes outside it.
pub trait StoragePort {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Flush pending writes to the medium.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and record decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored record failed its checksum.
    Corrupted,
    /// Stored record was written by another layout version.
    VersionMismatch(u8),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The storage backend failed.
    Storage(StorageError),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access past the end of the region.
    OutOfBounds,
    /// Generic I/O error.
    IoError,
    /// Pending writes could not be made durable.
    CommitFailed,
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::VersionMismatch(v) => write!(f, "unsupported config version {}", v),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::IoError => write!(f, "I/O error"),
            Self::CommitFailed => write!(f, "commit failed"),
        }
    }
}
