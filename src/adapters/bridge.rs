//! Channels between the control loop and a remote UI bridge.
//!
//! Uses `embassy-sync` bounded channels so an async network task and the
//! synchronous control loop can exchange messages without heap allocation
//! or callbacks.
//!
//! ```text
//! ┌──────────────┐   AppCommand  ┌──────────────┐
//! │ Bridge task  │──────────────▶│ Control loop │
//! │  (async)     │◀──────────────│  (sync)      │
//! └──────────────┘    AppEvent   └──────────────┘
//! ```
//!
//! The control loop never waits: a full event channel drops the newest
//! notification and counts it.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::AppCommand;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Channel depth for outbound notifications.
pub const EVENT_DEPTH: usize = 16;

/// Channel depth for inbound commands.
pub const COMMAND_DEPTH: usize = 8;

pub type EventChannel = Channel<CriticalSectionRawMutex, AppEvent, EVENT_DEPTH>;
pub type CommandChannel = Channel<CriticalSectionRawMutex, AppCommand, COMMAND_DEPTH>;

/// Notifications: control loop → bridge task.
pub static EVENT_CHANNEL: EventChannel = Channel::new();

/// Commands: bridge task → control loop.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();

/// [`EventSink`] that forwards into an event channel.
pub struct ChannelEventSink<'a> {
    channel: &'a EventChannel,
    dropped: u32,
}

impl<'a> ChannelEventSink<'a> {
    pub fn new(channel: &'a EventChannel) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Notifications lost to a full channel.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl EventSink for ChannelEventSink<'_> {
    fn emit(&mut self, event: &AppEvent) {
        if self.channel.try_send(*event).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            if self.dropped.is_power_of_two() {
                warn!("BRIDGE: event channel full, {} dropped", self.dropped);
            }
        }
    }
}

/// Fan one event out to two sinks.
pub struct TeeSink<'a, A: EventSink, B: EventSink> {
    pub first: &'a mut A,
    pub second: &'a mut B,
}

impl<A: EventSink, B: EventSink> EventSink for TeeSink<'_, A, B> {
    fn emit(&mut self, event: &AppEvent) {
        self.first.emit(event);
        self.second.emit(event);
    }
}

/// Queue a command from the bridge side.  Returns `false` when full.
pub fn submit_command(channel: &CommandChannel, cmd: AppCommand) -> bool {
    if channel.try_send(cmd).is_err() {
        warn!("BRIDGE: command channel full, {:?} rejected", cmd);
        return false;
    }
    true
}

/// Take the next pending command, if any.
pub fn try_recv_command(channel: &CommandChannel) -> Option<AppCommand> {
    channel.try_receive().ok()
}
