//! Protocol module - Defines the bootloader wire protocol
//!
//! Every message is a fixed 8 byte frame:
//! - 2 bytes request code (little-endian)
//! - 1 byte status code
//! - 1 byte packet id
//! - 4 bytes payload (little-endian)

mod message;
mod codec;

pub use message::*;
pub use codec::*;

/// Size of a single protocol frame in bytes
pub const FRAME_SIZE: usize = 8;

/// Bus address every device listens on for requests
pub const BROADCAST_ID: u32 = 0x780;

/// Base address used to derive per-device addresses
pub const BASE_ID: u32 = 0x781;

/// Largest standard (11-bit) CAN identifier
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Address a device sends its responses on.
///
/// The even neighbour (`BASE_ID + 2n`) is the device's request address on a
/// real bus; the simulator only uses the odd one.
pub const fn response_address(node_id: u8) -> u32 {
    BASE_ID + 2 * node_id as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_address_layout() {
        assert_eq!(response_address(0), 0x782);
        assert_eq!(response_address(5), 0x781 + 11);
        assert_eq!(response_address(255), BASE_ID + 511);
    }

    #[test]
    fn test_response_addresses_distinct() {
        let mut seen = std::collections::HashSet::new();
        for node_id in 0..=u8::MAX {
            let addr = response_address(node_id);
            assert_ne!(addr, BROADCAST_ID);
            assert!(seen.insert(addr), "address {:#x} reused", addr);
        }
    }
}
