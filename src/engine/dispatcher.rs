//! Request dispatcher
//!
//! Maps a request code to the response a device gives for it.

use crate::device::{Attribute, Device};
use crate::protocol::{Message, RequestType, Status};

/// What a device does with a known request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer with an attribute value
    Read(Attribute),
    /// Acknowledge without payload
    Ack,
}

/// Route for each known request. Exhaustive, so adding a request type
/// without a route fails to compile.
pub const fn route(request: RequestType) -> Route {
    match request {
        RequestType::Ping => Route::Read(Attribute::BootloaderVersion),
        RequestType::ResetDevice => Route::Ack,
        RequestType::StartApp => Route::Ack,
        RequestType::DevInfoBootloaderVersion => Route::Read(Attribute::BootloaderVersion),
        RequestType::DevInfoBootloaderCrc => Route::Read(Attribute::BootloaderCrc),
        RequestType::DevInfoVid => Route::Read(Attribute::VendorId),
        RequestType::DevInfoPid => Route::Read(Attribute::ProductId),
        RequestType::DevInfoPrd => Route::Read(Attribute::ProductionDate),
        RequestType::DevInfoUid1 => Route::Read(Attribute::Uid1),
        RequestType::DevInfoUid2 => Route::Read(Attribute::Uid2),
        RequestType::DevInfoUid3 => Route::Read(Attribute::Uid3),
        RequestType::DevInfoUid4 => Route::Read(Attribute::Uid4),
        RequestType::FlashInfoStartAddr => Route::Read(Attribute::FlashStartAddr),
        RequestType::FlashInfoPageSize => Route::Read(Attribute::FlashPageSize),
        RequestType::FlashInfoNumPages => Route::Read(Attribute::FlashNumPages),
        RequestType::AppInfoPageIdx => Route::Read(Attribute::AppPageIdx),
        RequestType::AppInfoCrcCalc => Route::Read(Attribute::AppCrc),
    }
}

/// Compute the response of `device` to a request.
///
/// Request code and packet id are always echoed. Unknown codes are answered
/// with `NotSupported` and an empty payload.
pub fn dispatch(request: u16, packet_id: u8, device: &Device) -> Message {
    let Some(request_type) = RequestType::from_u16(request) else {
        tracing::debug!(
            node_id = device.node_id(),
            "Unsupported request type: {:#06x}",
            request
        );
        return Message::response(request, Status::NotSupported, packet_id, 0);
    };

    // Reset and start-app have no simulated effect; the client only expects the ack
    let payload = match route(request_type) {
        Route::Read(attribute) => device.attribute(attribute),
        Route::Ack => 0,
    };

    Message::response(request, Status::Ok, packet_id, payload)
}
