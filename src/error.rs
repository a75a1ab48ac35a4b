//! Error taxonomy.
//!
//! One [`thiserror`]-derived enum per module boundary, plus a crate-wide
//! [`BoxError`] alias for the few spots that need to erase the concrete
//! error type, mirroring the teacher crate's own `BoxError`.

use std::io;

/// A type-erased error, used where the caller only needs to propagate,
/// not match on, the underlying failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that can occur constructing or running a single [`crate::node::Node`].
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Binding the node's datagram socket to its assigned port failed.
    #[error("failed to bind UDP socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Sending a datagram to a peer failed.
    #[error("failed to send datagram to {dest}: {source}")]
    Send {
        dest: u16,
        #[source]
        source: io::Error,
    },
}

/// Failures that can occur running the whole [`crate::network::Network`] simulation.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// `numOfNodes` exceeds the number of ports in the reserved range.
    #[error("requested {requested} nodes but only {available} ports are reserved")]
    PortRangeExhausted { requested: usize, available: usize },

    /// A node failed to come up.
    #[error("node failed to start: {0}")]
    NodeStartup(#[from] NodeError),

    /// Writing the final log/topology snapshot failed.
    #[error("failed to write logs for port {port}: {source}")]
    LogEmission {
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// Failures from a [`crate::topology::TopologySink`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to render topology: {0}")]
    Io(#[from] io::Error),
}
