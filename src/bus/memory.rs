//! In-memory bus for exercising the runner without a CAN interface

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Bus, BusError, BusFrame, BusResult};

enum Inbound {
    Frame(BusFrame),
    Fault(io::ErrorKind),
}

/// Scripted inbound queue plus a record of everything sent
#[derive(Default)]
pub struct MemoryBus {
    inbound: VecDeque<Inbound>,
    /// Frames sent, in order
    pub sent: Vec<BusFrame>,
    /// Set once `close` was called
    pub closed: bool,
    /// Raised when the inbound queue runs dry
    stop_when_drained: Option<Arc<AtomicBool>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: BusFrame) {
        self.inbound.push_back(Inbound::Frame(frame));
    }

    pub fn push_fault(&mut self, kind: io::ErrorKind) {
        self.inbound.push_back(Inbound::Fault(kind));
    }

    pub fn stop_when_drained(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop_when_drained = Some(stop);
        self
    }
}

impl Bus for MemoryBus {
    fn receive(&mut self) -> BusResult<Option<BusFrame>> {
        if self.closed {
            return Err(BusError::Closed);
        }

        match self.inbound.pop_front() {
            Some(Inbound::Frame(frame)) => Ok(Some(frame)),
            Some(Inbound::Fault(kind)) => Err(BusError::Io(io::Error::from(kind))),
            None => {
                if let Some(stop) = &self.stop_when_drained {
                    stop.store(true, Ordering::SeqCst);
                }
                Ok(None)
            }
        }
    }

    fn send(&mut self, address: u32, data: &[u8]) -> BusResult<()> {
        if self.closed {
            return Err(BusError::Closed);
        }
        self.sent.push(BusFrame::new(address, data));
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_frames_then_timeout() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut bus = MemoryBus::new().stop_when_drained(stop.clone());
        bus.push(BusFrame::new(0x780, vec![1, 2, 3]));

        assert_eq!(bus.receive().unwrap(), Some(BusFrame::new(0x780, vec![1, 2, 3])));
        assert!(!stop.load(Ordering::SeqCst));
        assert_eq!(bus.receive().unwrap(), None);
        assert!(stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_closed_bus_refuses_traffic() {
        let mut bus = MemoryBus::new();
        bus.close();

        assert!(bus.closed);
        assert!(matches!(bus.send(0x782, &[0; 8]), Err(BusError::Closed)));
        assert!(matches!(bus.receive(), Err(BusError::Closed)));
    }
}
