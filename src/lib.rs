//! A simulated peer-to-peer overlay: bounded bidirectional neighbour
//! discovery over an unreliable datagram transport, with churn injection
//! and a final per-node log/topology snapshot.

pub mod config;
pub mod constants;
pub mod error;
pub mod log;
pub mod message;
pub mod network;
pub mod node;
pub mod peer_info;
pub mod topology;
pub mod types;
