//! Fixed constants of the overlay specification.
//!
//! Every numeric value named by the spec lives here, named the way the
//! teacher crate names its protocol constants. Code that needs a duration
//! or threshold should prefer reading it off [`crate::config::Config`]
//! (which defaults to these values but can be shrunk in tests) rather than
//! referencing a constant directly, so tests stay fast without touching
//! CORE logic.

use std::time::Duration;

/// Lower bound (inclusive) of the reserved port-allocation range.
pub const PORT_RANGE_START: u16 = 10_000;

/// Upper bound (inclusive) of the reserved port-allocation range.
pub const PORT_RANGE_END: u16 = 11_000;

/// Number of distinct ports in `[PORT_RANGE_START, PORT_RANGE_END]`.
pub const PORT_RANGE_SIZE: usize = (PORT_RANGE_END - PORT_RANGE_START + 1) as usize;

/// How often the beaconer broadcasts a "Hello" to current neighbours.
pub const BEACON_PERIOD: Duration = Duration::from_secs(2);

/// How often the discoverer probes a nominee from the unknown pool.
pub const DISCOVERY_PERIOD: Duration = Duration::from_secs(2);

/// How often the scanner checks for stale peers.
pub const SCAN_PERIOD: Duration = Duration::from_secs(8);

/// How long without a received packet before a peer is considered stale.
///
/// Exactly 4x [`BEACON_PERIOD`], so a peer survives one lost beacon and its
/// retry before being demoted.
pub const STALENESS_THRESHOLD: Duration = Duration::from_secs(8);

/// How often the churn loop disables a randomly chosen node.
pub const CHURN_INTERVAL: Duration = Duration::from_secs(10);

/// How long a churn-disabled node stays disabled before it is resumed.
pub const CHURN_OUTAGE: Duration = Duration::from_secs(20);

/// Total wall-clock lifetime of a simulation run.
pub const SIMULATION_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Probability (0.0-1.0) that the receiver silently drops an inbound packet.
pub const PACKET_LOSS_PROBABILITY: f64 = 0.05;

/// Maximum serialized datagram size, in bytes.
pub const MAX_DATAGRAM_SIZE: usize = 1000;
