//! Simulation session
//!
//! Owns the simulated devices and fans every inbound broadcast frame out to
//! all of them, producing one response frame per device.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::dispatcher::dispatch;
use super::events::SimEvent;
use crate::device::{Device, DeviceProfile};
use crate::protocol::{self, RawFrame, BROADCAST_ID};

/// Capacity of the event channel; events beyond it are dropped
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Session construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("node-id {0} must be between 0 and 255")]
    NodeIdOutOfRange(u32),

    #[error("Duplicate node id {0} is not allowed")]
    DuplicateNodeId(u8),

    #[error("At least one node id is required")]
    NoDevices,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// A response frame ready to be put on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outbound {
    /// Device that produced the frame
    pub node_id: u8,
    /// Bus address to send on
    pub address: u32,
    /// Encoded response
    pub frame: RawFrame,
}

/// Simulation session
pub struct Session {
    /// Address all devices listen on
    broadcast_id: u32,
    /// Devices keyed by node id
    devices: BTreeMap<u8, Device>,
    /// Event sender
    event_tx: mpsc::Sender<SimEvent>,
    /// Event receiver (for consumers)
    event_rx: Option<mpsc::Receiver<SimEvent>>,
    /// Events lost because the channel was full
    dropped_events: AtomicU64,
}

impl Session {
    /// Create a session with one device per node id
    pub fn new(node_ids: &[u32], profile: &DeviceProfile) -> SessionResult<Self> {
        if node_ids.is_empty() {
            return Err(SessionError::NoDevices);
        }

        let mut devices = BTreeMap::new();
        for &raw_id in node_ids {
            let node_id = u8::try_from(raw_id).map_err(|_| SessionError::NodeIdOutOfRange(raw_id))?;
            if devices.contains_key(&node_id) {
                return Err(SessionError::DuplicateNodeId(node_id));
            }
            devices.insert(node_id, Device::new(node_id, profile));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            broadcast_id: BROADCAST_ID,
            devices,
            event_tx,
            event_rx: Some(event_rx),
            dropped_events: AtomicU64::new(0),
        })
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SimEvent>> {
        self.event_rx.take()
    }

    pub fn broadcast_id(&self) -> u32 {
        self.broadcast_id
    }

    /// Devices in ascending node id order
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn device(&self, node_id: u8) -> Option<&Device> {
        self.devices.get(&node_id)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Number of event records lost to a full channel
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Handle one inbound broadcast frame.
    ///
    /// Returns one response per device, ordered by node id. Frames that fail
    /// to decode are dropped and produce no responses.
    pub fn handle_inbound(&self, raw: &[u8]) -> Vec<Outbound> {
        let request = match protocol::decode(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Invalid message: {}", e);
                self.emit(SimEvent::DecodeFailed {
                    len: raw.len(),
                    reason: e.to_string(),
                });
                return Vec::new();
            }
        };

        tracing::trace!(
            request = request.request_code(),
            packet_id = request.packet_id(),
            "Broadcast request"
        );

        self.devices
            .values()
            .map(|device| {
                let response = dispatch(request.request_code(), request.packet_id(), device);

                self.emit(SimEvent::Responded {
                    node_id: device.node_id(),
                    request: response.request_code(),
                    packet_id: response.packet_id(),
                    status: response.status(),
                    payload: response.payload(),
                });

                Outbound {
                    node_id: device.node_id(),
                    address: device.response_address(),
                    frame: protocol::encode(&response),
                }
            })
            .collect()
    }

    fn emit(&self, event: SimEvent) {
        // Never block the bus on reporting; count what the consumer could not keep up with
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            if self.dropped_events.fetch_add(1, Ordering::Relaxed) == 0 {
                tracing::warn!(
                    "Event channel full ({} records), dropping events",
                    EVENT_CHANNEL_CAPACITY
                );
            }
        }
    }
}
