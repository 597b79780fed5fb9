//! Snapshot fan-out to connected participants

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::game::snapshot::{SnapshotStats, WorldSnapshot};
use crate::game::state::PARTICIPANT_SLOTS;
use crate::util::rate_limit::{LogThrottle, SEND_FAILURE_LOG_RATE};

use super::protocol::ServerMsg;

/// Encoded line shared by every recipient of one broadcast
pub type OutboundLine = Arc<str>;

/// Outbound side of one participant's connection
struct Link {
    /// Cleared by the session reader when the peer goes away
    connected: Arc<AtomicBool>,
    /// Bounded queue drained by the session writer task
    outbound: mpsc::Sender<OutboundLine>,
    send_failures: LogThrottle,
}

/// Result of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Slots never attached or marked disconnected
    pub skipped: usize,
    pub failed: usize,
}

/// Serializes snapshots once and hands the line to every connected participant.
///
/// Sends never block: a participant whose writer is backed up or gone simply
/// misses this snapshot. Nothing is retried.
pub struct Broadcaster {
    links: [Option<Link>; PARTICIPANT_SLOTS],
    stats: SnapshotStats,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            links: [None, None],
            stats: SnapshotStats::default(),
        }
    }

    /// Register the outbound queue and connectivity flag of a slot
    pub fn attach(
        &mut self,
        slot: usize,
        connected: Arc<AtomicBool>,
        outbound: mpsc::Sender<OutboundLine>,
    ) {
        if let Some(entry) = self.links.get_mut(slot) {
            *entry = Some(Link {
                connected,
                outbound,
                send_failures: LogThrottle::new(SEND_FAILURE_LOG_RATE),
            });
        }
    }

    /// Number of slots currently flagged as connected
    #[cfg(test)]
    pub fn connected_count(&self) -> usize {
        self.links
            .iter()
            .flatten()
            .filter(|link| link.connected.load(Ordering::Acquire))
            .count()
    }

    /// Encode the snapshot once and send it to each connected participant
    pub fn broadcast(&mut self, snapshot: &WorldSnapshot) -> BroadcastReport {
        let line: OutboundLine = ServerMsg::State(snapshot.clone()).encode().into();
        let mut report = BroadcastReport::default();

        for (slot, entry) in self.links.iter_mut().enumerate() {
            let Some(link) = entry else {
                report.skipped += 1;
                continue;
            };
            if !link.connected.load(Ordering::Acquire) {
                report.skipped += 1;
                continue;
            }

            match link.outbound.try_send(line.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    let reason = match e {
                        TrySendError::Full(_) => "outbound queue full",
                        TrySendError::Closed(_) => "writer closed",
                    };
                    if let Some(suppressed) = link.send_failures.check() {
                        warn!(
                            participant = slot + 1,
                            tick = snapshot.tick,
                            suppressed,
                            reason,
                            "Failed to send STATE"
                        );
                    }
                }
            }
        }

        self.stats.record(report.delivered, line.len() + 1);
        debug!(tick = snapshot.tick, delivered = report.delivered, "Broadcast snapshot");
        report
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
