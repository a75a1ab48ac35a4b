//! Per-peer bookkeeping, as seen from one node's point of view.

use chrono::{DateTime, Duration, Utc};

use crate::types::Port;

/// Everything one node tracks about one other peer.
///
/// A node owns one `PeerInfo` per peer it was constructed with; this
/// mapping never grows or shrinks after construction (peers only move
/// between the three classification sets in [`crate::node::NodeState`]).
#[derive(Clone, Debug)]
pub struct PeerInfo {
    /// Last time we sent this peer a datagram, if ever.
    pub last_sent: Option<DateTime<Utc>>,
    /// Last time we received a datagram from this peer, if ever.
    pub last_received: Option<DateTime<Utc>>,
    pub packets_sent: u64,
    pub packets_received: u64,
    /// Sticky: once true, never cleared (invariant I5).
    pub became_neighbour: bool,
    /// Set iff this peer is currently in the `bi` set (invariant I3).
    pub connection_starting_time: Option<DateTime<Utc>>,
    /// Cumulative time spent as a `bi` neighbour, finalised on every
    /// transition out of `bi` (invariant I4).
    pub connection_length: Duration,
    /// The peer's own most recently reported `bi` set.
    pub neighbours: Vec<Port>,
}

impl Default for PeerInfo {
    fn default() -> Self {
        PeerInfo {
            last_sent: None,
            last_received: None,
            packets_sent: 0,
            packets_received: 0,
            became_neighbour: false,
            connection_starting_time: None,
            connection_length: Duration::zero(),
            neighbours: Vec::new(),
        }
    }
}

impl PeerInfo {
    /// Finalise `connection_length` for a peer leaving the `bi` set at `now`.
    ///
    /// No-op (but still clears the starting time) if the peer was never
    /// marked as currently connected, so callers don't need to guard the
    /// call site.
    pub fn finalise_connection(&mut self, now: DateTime<Utc>) {
        if let Some(started) = self.connection_starting_time.take() {
            self.connection_length = self.connection_length + (now - started);
        }
    }

    /// Begin tracking connection time for a peer entering the `bi` set.
    pub fn begin_connection(&mut self, now: DateTime<Utc>) {
        self.became_neighbour = true;
        self.connection_starting_time = Some(now);
    }

    /// This peer's last-sent/last-received timestamps, as wire-format
    /// milliseconds since the Unix epoch.
    pub fn wire_timestamps(&self) -> (Option<i64>, Option<i64>) {
        (
            self.last_sent.map(|t| t.timestamp_millis()),
            self.last_received.map(|t| t.timestamp_millis()),
        )
    }
}
