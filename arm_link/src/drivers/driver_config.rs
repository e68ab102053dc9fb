use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ArmError;

/// Where the arm controller lives and how to behave when the link drops.
///
/// ```rust,ignore
/// let config = ArmDriverConfig::new("192.168.4.1".to_string(), 81);
/// config.validate()?;
/// assert_eq!(config.connection_url(), "ws://192.168.4.1:81/");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArmDriverConfig {
    pub host: String,
    pub port: u16,
    /// Delay before reconnecting after the link is lost.
    pub reconnect_delay_ms: u64,
}

impl ArmDriverConfig {
    pub const DEFAULT_PORT: u16 = 81;
    pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 800;

    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            reconnect_delay_ms: Self::DEFAULT_RECONNECT_DELAY_MS,
        }
    }

    pub fn validate(&self) -> Result<(), ArmError> {
        if self.host.trim().is_empty() {
            return Err(ArmError::InvalidConfig("Host cannot be empty.".to_string()));
        }
        if self.host.contains('/') || self.host.contains(char::is_whitespace) {
            return Err(ArmError::InvalidConfig(format!("Host '{}' is not a bare host name.", self.host)));
        }
        if self.port == 0 {
            return Err(ArmError::InvalidConfig("Port number must be greater than 0.".to_string()));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ArmError::InvalidConfig("Reconnect delay must be greater than 0.".to_string()));
        }
        Ok(())
    }

    /// WebSocket URL of the controller, e.g. `ws://192.168.4.1:81/`.
    pub fn connection_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.port)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for ArmDriverConfig {
    fn default() -> Self {
        // The controller runs its own access point and sits at this address.
        Self::new("192.168.4.1".to_string(), Self::DEFAULT_PORT)
    }
}
