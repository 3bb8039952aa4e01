//! SocketCAN bus
//!
//! Requirements:
//! - The interface must exist and be up (`vcan0` for local testing)

use std::io;
use std::time::Duration;

use socketcan::{
    CanDataFrame, CanFilter, CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame, Id, Socket,
    SocketOptions, StandardId,
};

use super::{Bus, BusError, BusFrame, BusResult};
use crate::protocol::{BROADCAST_ID, MAX_STANDARD_ID};

/// Bus backed by a raw CAN socket
pub struct SocketCanBus {
    interface: String,
    socket: Option<CanSocket>,
}

impl SocketCanBus {
    /// Open `interface` and only accept frames addressed to the broadcast id
    pub fn open(interface: &str, rx_timeout: Duration) -> BusResult<Self> {
        let connectivity = |source: io::Error| BusError::Connectivity {
            interface: interface.to_string(),
            source,
        };

        let socket = CanSocket::open(interface).map_err(connectivity)?;
        socket.set_read_timeout(Some(rx_timeout)).map_err(connectivity)?;
        socket
            .set_filters(&[CanFilter::new(BROADCAST_ID, MAX_STANDARD_ID)])
            .map_err(connectivity)?;

        tracing::info!("Connected to {}", interface);

        Ok(Self {
            interface: interface.to_string(),
            socket: Some(socket),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn socket(&self) -> BusResult<&CanSocket> {
        self.socket.as_ref().ok_or(BusError::Closed)
    }
}

/// Requests only arrive as standard frames; an extended frame that happens
/// to carry the broadcast id is not addressed to us
fn inbound_frame(frame: &CanDataFrame) -> Option<BusFrame> {
    if frame.is_extended() {
        tracing::trace!("Ignoring extended frame {:#x}", frame.raw_id());
        return None;
    }
    Some(BusFrame::new(frame.raw_id(), frame.data()))
}

fn bus_id(address: u32) -> BusResult<Id> {
    // Response addresses of high node ids exceed the 11-bit range
    if address <= MAX_STANDARD_ID {
        StandardId::new(address as u16)
            .map(Id::Standard)
            .ok_or(BusError::InvalidAddress(address))
    } else {
        ExtendedId::new(address)
            .map(Id::Extended)
            .ok_or(BusError::InvalidAddress(address))
    }
}

impl Bus for SocketCanBus {
    fn receive(&mut self) -> BusResult<Option<BusFrame>> {
        let socket = self.socket()?;

        match socket.read_frame() {
            Ok(CanFrame::Data(frame)) => Ok(inbound_frame(&frame)),
            Ok(_) => Ok(None),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(BusError::Io(e)),
        }
    }

    fn send(&mut self, address: u32, data: &[u8]) -> BusResult<()> {
        let socket = self.socket()?;
        let frame = CanDataFrame::new(bus_id(address)?, data)
            .ok_or(BusError::InvalidPayload(data.len()))?;

        socket.write_frame(&frame)?;
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            tracing::info!("Closed {}", self.interface);
        }
    }
}

impl Drop for SocketCanBus {
    fn drop(&mut self) {
        self.close();
    }
}
