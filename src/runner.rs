//! Simulation loop
//!
//! Receives frames from the bus, hands broadcast frames to the session and
//! puts every response back on the bus. The loop checks the stop flag once
//! per receive cycle, so shutdown latency is bounded by the receive timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::bus::Bus;
use crate::engine::Session;

/// Pause after a bus error before the next receive
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Counters collected over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Broadcast frames handed to the session
    pub frames_handled: u64,
    /// Frames not addressed to the broadcast id
    pub frames_ignored: u64,
    /// Broadcast frames that failed to decode
    pub frames_dropped: u64,
    /// Response frames put on the bus
    pub responses_sent: u64,
    /// Receive or send failures
    pub bus_errors: u64,
    /// Event records lost to a full reporting channel
    pub events_dropped: u64,
}

/// Run until `stop` is raised
pub fn run<B: Bus>(bus: &mut B, session: &Session, stop: &AtomicBool) -> RunStats {
    let mut stats = RunStats::default();

    tracing::info!(
        "Listening for messages on CAN ID {:#05x}",
        session.broadcast_id()
    );

    while !stop.load(Ordering::SeqCst) {
        let frame = match bus.receive() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!("Error in message loop: {}", e);
                stats.bus_errors += 1;
                std::thread::sleep(ERROR_BACKOFF);
                continue;
            }
        };

        if frame.id != session.broadcast_id() {
            tracing::trace!("Ignoring frame on {:#x}", frame.id);
            stats.frames_ignored += 1;
            continue;
        }

        let batch = session.handle_inbound(&frame.data);
        if batch.is_empty() {
            stats.frames_dropped += 1;
            continue;
        }
        stats.frames_handled += 1;

        for out in batch {
            match bus.send(out.address, &out.frame) {
                Ok(()) => stats.responses_sent += 1,
                Err(e) => {
                    tracing::error!("Node {}: send on {:#x} failed: {}", out.node_id, out.address, e);
                    stats.bus_errors += 1;
                }
            }
        }
    }

    stats.events_dropped = session.dropped_events();

    tracing::info!(
        handled = stats.frames_handled,
        ignored = stats.frames_ignored,
        dropped = stats.frames_dropped,
        sent = stats.responses_sent,
        errors = stats.bus_errors,
        events_dropped = stats.events_dropped,
        "Simulation loop stopped"
    );

    stats
}
