//! Pad controller connection
//!
//! The core only needs four things from the hardware: open it, receive its
//! events, send it LED updates, and close it. Inbound events are delivered
//! through a bounded channel filled from the MIDI backend's own thread.

use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::midi::WireEvent;

mod launchpad;
#[cfg(test)]
pub(crate) mod mock;

pub use launchpad::{discovery, LaunchpadDevice};

/// Capacity of the inbound event channel
pub const INBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("MIDI port '{0}' not found")]
    PortNotFound(String),

    #[error("not connected to the device")]
    NotConnected,

    #[error("MIDI backend error: {0}")]
    Backend(String),

    #[error("failed to send MIDI message: {0}")]
    Send(String),
}

/// Raw MIDI packet received from the device
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub timestamp: Instant,
    pub raw_data: Vec<u8>,
}

impl DeviceEvent {
    pub fn new(raw_data: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: Instant::now(),
            raw_data: raw_data.into(),
        }
    }
}

/// Connection to a pad controller
///
/// All methods take `&self` so the connection can be shared between the
/// controller and its feedback path; implementations use interior
/// mutability.
pub trait DeviceConnection: Send + Sync {
    /// Open the device and start delivering its events
    fn connect(&self, identifier: &str) -> Result<mpsc::Receiver<DeviceEvent>, DeviceError>;

    /// Send one outbound event
    fn send(&self, event: &WireEvent) -> Result<(), DeviceError>;

    /// Close both directions; safe to call more than once
    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
