//! Protocol message definitions
//!
//! Defines the request codes, status codes and the message value carried in
//! every frame.

use std::fmt;

/// Known bootloader request codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestType {
    /// Ping device, answered with the bootloader version
    Ping = 0x0001,
    /// Hardware reset
    ResetDevice = 0x0011,
    /// Leave the bootloader and start the application
    StartApp = 0x0012,

    DevInfoBootloaderVersion = 0x0101,
    DevInfoBootloaderCrc = 0x0102,
    DevInfoVid = 0x0103,
    DevInfoPid = 0x0104,
    DevInfoPrd = 0x0105,
    DevInfoUid1 = 0x0106,
    DevInfoUid2 = 0x0107,
    DevInfoUid3 = 0x0108,
    DevInfoUid4 = 0x0109,

    FlashInfoStartAddr = 0x0201,
    FlashInfoPageSize = 0x0202,
    FlashInfoNumPages = 0x0203,

    AppInfoPageIdx = 0x0301,
    AppInfoCrcCalc = 0x0302,
}

impl RequestType {
    /// Every known request, in code order
    pub const ALL: [RequestType; 17] = [
        RequestType::Ping,
        RequestType::ResetDevice,
        RequestType::StartApp,
        RequestType::DevInfoBootloaderVersion,
        RequestType::DevInfoBootloaderCrc,
        RequestType::DevInfoVid,
        RequestType::DevInfoPid,
        RequestType::DevInfoPrd,
        RequestType::DevInfoUid1,
        RequestType::DevInfoUid2,
        RequestType::DevInfoUid3,
        RequestType::DevInfoUid4,
        RequestType::FlashInfoStartAddr,
        RequestType::FlashInfoPageSize,
        RequestType::FlashInfoNumPages,
        RequestType::AppInfoPageIdx,
        RequestType::AppInfoCrcCalc,
    ];

    /// Convert from a wire code. Unknown codes yield `None`.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Ping),
            0x0011 => Some(Self::ResetDevice),
            0x0012 => Some(Self::StartApp),
            0x0101 => Some(Self::DevInfoBootloaderVersion),
            0x0102 => Some(Self::DevInfoBootloaderCrc),
            0x0103 => Some(Self::DevInfoVid),
            0x0104 => Some(Self::DevInfoPid),
            0x0105 => Some(Self::DevInfoPrd),
            0x0106 => Some(Self::DevInfoUid1),
            0x0107 => Some(Self::DevInfoUid2),
            0x0108 => Some(Self::DevInfoUid3),
            0x0109 => Some(Self::DevInfoUid4),
            0x0201 => Some(Self::FlashInfoStartAddr),
            0x0202 => Some(Self::FlashInfoPageSize),
            0x0203 => Some(Self::FlashInfoNumPages),
            0x0301 => Some(Self::AppInfoPageIdx),
            0x0302 => Some(Self::AppInfoCrcCalc),
            _ => None,
        }
    }

    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::ResetDevice => "RESET_DEVICE",
            Self::StartApp => "START_APP",
            Self::DevInfoBootloaderVersion => "DEV_INFO_BOOTLOADER_VERSION",
            Self::DevInfoBootloaderCrc => "DEV_INFO_BOOTLOADER_CRC",
            Self::DevInfoVid => "DEV_INFO_VID",
            Self::DevInfoPid => "DEV_INFO_PID",
            Self::DevInfoPrd => "DEV_INFO_PRD",
            Self::DevInfoUid1 => "DEV_INFO_UID1",
            Self::DevInfoUid2 => "DEV_INFO_UID2",
            Self::DevInfoUid3 => "DEV_INFO_UID3",
            Self::DevInfoUid4 => "DEV_INFO_UID4",
            Self::FlashInfoStartAddr => "FLASH_INFO_START_ADDR",
            Self::FlashInfoPageSize => "FLASH_INFO_PAGE_SIZE",
            Self::FlashInfoNumPages => "FLASH_INFO_NUM_PAGES",
            Self::AppInfoPageIdx => "APP_INFO_PAGE_IDX",
            Self::AppInfoCrcCalc => "APP_INFO_CRC_CALC",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome carried in the status byte of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    None = 0x00,
    Ok = 0x01,
    Error = 0xFE,
    UnknownRequest = 0xFD,
    NotSupported = 0xFC,
    InvalidCrc = 0xFB,
    PageFull = 0xFA,
    InvalidArgument = 0xF9,
}

impl Status {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Ok),
            0xFE => Some(Self::Error),
            0xFD => Some(Self::UnknownRequest),
            0xFC => Some(Self::NotSupported),
            0xFB => Some(Self::InvalidCrc),
            0xFA => Some(Self::PageFull),
            0xF9 => Some(Self::InvalidArgument),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::UnknownRequest => "ERR_UNKNOWN_REQ",
            Self::NotSupported => "ERR_NOT_SUPPORTED",
            Self::InvalidCrc => "ERR_CRC_INVLD",
            Self::PageFull => "ERR_PAGE_FULL",
            Self::InvalidArgument => "ERR_INVLD_ARG",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single protocol message.
///
/// The request and status fields keep their raw wire values so that any
/// frame survives a decode/encode cycle unchanged; use [`Message::request_type`]
/// and [`Message::status_type`] for the typed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    request: u16,
    status: u8,
    packet_id: u8,
    payload: u32,
}

impl Message {
    pub const fn new(request: u16, status: u8, packet_id: u8, payload: u32) -> Self {
        Self {
            request,
            status,
            packet_id,
            payload,
        }
    }

    /// Build a request as a client would send it (status `None`)
    pub const fn request(request: RequestType, packet_id: u8, payload: u32) -> Self {
        Self::new(request.as_u16(), Status::None.as_u8(), packet_id, payload)
    }

    /// Build a response echoing `request` and `packet_id`
    pub const fn response(request: u16, status: Status, packet_id: u8, payload: u32) -> Self {
        Self::new(request, status.as_u8(), packet_id, payload)
    }

    pub const fn request_code(&self) -> u16 {
        self.request
    }

    pub fn request_type(&self) -> Option<RequestType> {
        RequestType::from_u16(self.request)
    }

    pub const fn status(&self) -> u8 {
        self.status
    }

    pub fn status_type(&self) -> Option<Status> {
        Status::from_u8(self.status)
    }

    pub const fn packet_id(&self) -> u8 {
        self.packet_id
    }

    pub const fn payload(&self) -> u32 {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_codes_roundtrip() {
        for request in RequestType::ALL {
            assert_eq!(RequestType::from_u16(request.as_u16()), Some(request));
        }
    }

    #[test]
    fn test_unknown_request_code() {
        assert_eq!(RequestType::from_u16(0x9999), None);
        assert_eq!(RequestType::from_u16(0x0000), None);
        // Code exists in the full bootloader but is not simulated
        assert_eq!(RequestType::from_u16(0x0303), None);
    }

    #[test]
    fn test_from_u16_accepts_exactly_the_known_codes() {
        for code in 0..=u16::MAX {
            let known = RequestType::ALL.iter().any(|r| r.as_u16() == code);
            assert_eq!(RequestType::from_u16(code).is_some(), known, "code {:#06x}", code);
        }
    }

    #[test]
    fn test_status_values() {
        assert_eq!(Status::Ok.as_u8(), 0x01);
        assert_eq!(Status::NotSupported.as_u8(), 0xFC);
        assert_eq!(Status::from_u8(0xF9), Some(Status::InvalidArgument));
        assert_eq!(Status::from_u8(0x42), None);
    }

    #[test]
    fn test_message_accessors() {
        let msg = Message::request(RequestType::DevInfoPid, 9, 0);
        assert_eq!(msg.request_code(), 0x0104);
        assert_eq!(msg.request_type(), Some(RequestType::DevInfoPid));
        assert_eq!(msg.status_type(), Some(Status::None));
        assert_eq!(msg.packet_id(), 9);
        assert_eq!(msg.payload(), 0);
    }
}
