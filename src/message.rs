//! Wire format for the overlay's single datagram message: "Hello".

use serde::{Deserialize, Serialize};

use crate::types::Port;

/// Source address as carried on the wire, `{"IP": ..., "port": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireAddr {
    #[serde(rename = "IP")]
    pub ip: String,
    pub port: Port,
}

/// A single "Hello" datagram.
///
/// Every field the receiver needs is carried statelessly: `unSet`/`biSet`
/// membership is reported per-sender, so a recipient can run the whole
/// classification state machine (§4.1 of the spec) from this message alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hello {
    /// The sender's own port.
    pub id: Port,
    pub src: WireAddr,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(rename = "uniNeighbours")]
    pub uni_neighbours: Vec<Port>,
    #[serde(rename = "biNeighbours")]
    pub bi_neighbours: Vec<Port>,
    /// Milliseconds since the Unix epoch, or `None` if never sent/received,
    /// recomputed per-recipient immediately before transmission.
    #[serde(rename = "lastSent")]
    pub last_sent: Option<i64>,
    #[serde(rename = "lastReceived")]
    pub last_received: Option<i64>,
}

/// The only message kind this protocol defines.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageKind {
    Hello,
}

impl Hello {
    pub fn new(
        id: Port,
        uni_neighbours: Vec<Port>,
        bi_neighbours: Vec<Port>,
        last_sent: Option<i64>,
        last_received: Option<i64>,
    ) -> Self {
        Hello {
            id,
            src: WireAddr {
                ip: "localhost".to_string(),
                port: id,
            },
            kind: MessageKind::Hello,
            uni_neighbours,
            bi_neighbours,
            last_sent,
            last_received,
        }
    }

    /// Does `self.port` appear in this message's advertised uni or bi set?
    pub fn advertises(&self, port: Port) -> bool {
        self.uni_neighbours.contains(&port) || self.bi_neighbours.contains(&port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let hello = Hello::new(Port(10_001), vec![Port(10_002)], vec![Port(10_003)], Some(1), None);
        let encoded = serde_json::to_vec(&hello).unwrap();
        assert!(encoded.len() <= crate::constants::MAX_DATAGRAM_SIZE);
        let decoded: Hello = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.id, hello.id);
        assert_eq!(decoded.uni_neighbours, hello.uni_neighbours);
        assert_eq!(decoded.bi_neighbours, hello.bi_neighbours);
    }

    #[test]
    fn advertises_checks_both_sets() {
        let hello = Hello::new(Port(1), vec![Port(2)], vec![Port(3)], None, None);
        assert!(hello.advertises(Port(2)));
        assert!(hello.advertises(Port(3)));
        assert!(!hello.advertises(Port(4)));
    }
}
