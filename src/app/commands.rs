//! Inbound commands to the application service.
//!
//! These are actions requested by the outside world (front-panel button,
//! the network bridge, the configuration web UI) that the
//! [`AppService`](super::service::AppService) validates and acts upon.

use crate::config::{ConfigField, ConfigRecord};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Enter or leave service mode (pump forced off while set).
    SetServiceMode(bool),

    /// Flip service mode (button short press).
    ToggleServiceMode,

    /// Clear a latched pump safety lock (button long press / remote switch).
    ResetSafetyLock,

    /// Enable or disable audible reminders.
    SetSoundEnabled(bool),

    /// Edit one configuration value.
    SetField(ConfigField),

    /// Replace the whole configuration (web UI bulk save).
    ReplaceConfig(ConfigRecord),

    /// Persist the current configuration now.
    SaveConfig,

    /// Restore factory defaults and persist them.
    FactoryReset,
}
