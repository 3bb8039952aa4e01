//! Structured records emitted while handling inbound frames

use crate::protocol::{RequestType, Status};

/// Events emitted by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// A device produced a response
    Responded {
        node_id: u8,
        request: u16,
        packet_id: u8,
        status: u8,
        payload: u32,
    },
    /// An inbound frame could not be decoded and was dropped
    DecodeFailed {
        len: usize,
        reason: String,
    },
}

impl SimEvent {
    /// Human readable request name, falling back to the raw code
    pub fn request_name(request: u16) -> String {
        match RequestType::from_u16(request) {
            Some(request_type) => request_type.to_string(),
            None => format!("UNKNOWN({:#06x})", request),
        }
    }

    pub fn status_name(status: u8) -> String {
        match Status::from_u8(status) {
            Some(status) => status.to_string(),
            None => format!("{:#04x}", status),
        }
    }
}
