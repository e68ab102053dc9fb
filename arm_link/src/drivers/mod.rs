#[cfg(feature="driver")]
mod driver;
#[cfg(feature="driver")]
pub use driver::*;

mod driver_config;
pub use driver_config::*;

use crate::packets::{ArmCommand, ArmResponse};

/// Outbound half of the transport, as seen by the state machines.
///
/// Sending is at-most-once: when the link is not open the command is
/// dropped, never queued for later.
pub trait CommandSink: Send + Sync {
    fn is_open(&self) -> bool;
    fn send(&self, command: ArmCommand);
}

/// What the transport session reports to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Connected,
    Disconnected,
    Message(ArmResponse),
}

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

impl LinkState {
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Connected => "CONNECTED",
            LinkState::Disconnected => "DISCONNECTED",
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::Disconnected
    }
}
