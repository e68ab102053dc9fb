// Simulated arm controller speaking the JSON-over-WebSocket protocol.

pub mod device;
pub mod server;

pub use device::{DeviceState, Effect};
pub use server::{serve, Simulator};
