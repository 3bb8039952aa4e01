//! Bus module - Transport used to reach the client tool
//!
//! This module provides:
//! - The `Bus` trait the runner drives
//! - A SocketCAN implementation (Linux)
//! - An in-memory bus for tests

#[cfg(target_os = "linux")]
mod can;

#[cfg(test)]
mod memory;

use std::io;
use thiserror::Error;

#[cfg(target_os = "linux")]
pub use can::SocketCanBus;

#[cfg(test)]
pub use memory::MemoryBus;

/// Errors that can occur on the bus
#[derive(Error, Debug)]
pub enum BusError {
    #[error(
        "Could not open CAN interface '{interface}': {source}\n\
         Make sure the interface exists and you have permissions.\n\
         For virtual CAN: sudo ip link add dev vcan0 type vcan && sudo ip link set vcan0 up"
    )]
    Connectivity {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid bus address: {0:#x}")]
    InvalidAddress(u32),

    #[error("Invalid frame payload: {0} bytes")]
    InvalidPayload(usize),

    #[error("Bus is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type BusResult<T> = Result<T, BusError>;

/// A frame received from the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusFrame {
    /// Bus address the frame was sent to
    pub id: u32,
    /// Frame data (at most 8 bytes on classic CAN)
    pub data: Vec<u8>,
}

impl BusFrame {
    pub fn new(id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

/// Transport the simulator listens and answers on
pub trait Bus {
    /// Wait for the next frame.
    /// Returns `Ok(None)` once the receive timeout elapses.
    fn receive(&mut self) -> BusResult<Option<BusFrame>>;

    /// Send a frame, no delivery acknowledgment
    fn send(&mut self, address: u32, data: &[u8]) -> BusResult<()>;

    /// Release the underlying handle
    fn close(&mut self);
}
