//! Core address types used across the overlay.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// A node's identifying port within the simulation.
///
/// Every node in the simulation binds to `127.0.0.1:<port>`, so a `Port`
/// doubles as the node's transport address once combined with the loopback
/// IP in [`Port::socket_addr`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Port(pub u16);

impl Port {
    /// The loopback address every simulated node listens on.
    pub const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// The socket address this port resolves to on loopback.
    pub fn socket_addr(self) -> SocketAddr {
        SocketAddr::new(Self::LOOPBACK, self.0)
    }

    /// Render as `"127.0.0.1:<port>"`, the address form used in log output.
    pub fn address_form(self) -> String {
        format!("{}:{}", Ipv4Addr::LOCALHOST, self.0)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Port {
    fn from(value: u16) -> Self {
        Port(value)
    }
}
