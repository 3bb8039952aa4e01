//! Protocol codec for encoding/decoding messages
//!
//! Frames have a fixed layout, so both directions are single pass and
//! allocation free.

use bytes::{Buf, BufMut};
use thiserror::Error;

use super::{Message, FRAME_SIZE};

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid frame length: {len} bytes (expected 8)")]
    InvalidLength { len: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Raw wire representation of a message
pub type RawFrame = [u8; FRAME_SIZE];

/// Encode a message into its wire format
pub fn encode(message: &Message) -> RawFrame {
    let mut frame = [0u8; FRAME_SIZE];
    let mut buf = &mut frame[..];

    buf.put_u16_le(message.request_code());
    buf.put_u8(message.status());
    buf.put_u8(message.packet_id());
    buf.put_u32_le(message.payload());

    frame
}

/// Decode a message from its wire format
///
/// Only the length is checked; request and status values are accepted as-is.
pub fn decode(raw: &[u8]) -> CodecResult<Message> {
    if raw.len() != FRAME_SIZE {
        return Err(CodecError::InvalidLength { len: raw.len() });
    }

    let mut buf = raw;
    let request = buf.get_u16_le();
    let status = buf.get_u8();
    let packet_id = buf.get_u8();
    let payload = buf.get_u32_le();

    Ok(Message::new(request, status, packet_id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RequestType, Status};
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let msg = Message::response(0x0104, Status::Ok, 7, 0x1122_3344);
        assert_eq!(
            encode(&msg),
            [0x04, 0x01, 0x01, 0x07, 0x44, 0x33, 0x22, 0x11]
        );
    }

    #[test]
    fn test_decode_ping() {
        let raw = [0x01, 0x00, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00];
        let msg = decode(&raw).unwrap();

        assert_eq!(msg.request_type(), Some(RequestType::Ping));
        assert_eq!(msg.status_type(), Some(Status::None));
        assert_eq!(msg.packet_id(), 0x2A);
        assert_eq!(msg.payload(), 0);
    }

    #[test]
    fn test_decode_accepts_unknown_codes() {
        let raw = [0x99, 0x99, 0x77, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let msg = decode(&raw).unwrap();

        assert_eq!(msg.request_code(), 0x9999);
        assert_eq!(msg.request_type(), None);
        assert_eq!(msg.status(), 0x77);
        assert_eq!(msg.payload(), u32::MAX);
    }

    #[test]
    fn test_decode_rejects_wrong_lengths() {
        for len in [0, 1, 5, 7, 9, 16, 64] {
            let raw = vec![0u8; len];
            assert_eq!(decode(&raw), Err(CodecError::InvalidLength { len }));
        }
    }

    proptest! {
        #[test]
        fn prop_roundtrip(request: u16, status: u8, packet_id: u8, payload: u32) {
            let msg = Message::new(request, status, packet_id, payload);
            prop_assert_eq!(decode(&encode(&msg)).unwrap(), msg);
        }

        #[test]
        fn prop_non_frame_lengths_fail(raw in proptest::collection::vec(any::<u8>(), 0..32)) {
            prop_assume!(raw.len() != FRAME_SIZE);
            prop_assert!(decode(&raw).is_err());
        }
    }
}
