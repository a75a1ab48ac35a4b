//! The per-node neighbour-discovery and maintenance state machine.
//!
//! A [`Node`] owns a datagram endpoint and four cooperating activities
//! (receiver, beaconer, discoverer, scanner) that mutate a single
//! [`NodeState`] under one lock, per the spec's concurrency model.

mod beaconer;
mod discoverer;
mod receiver;
mod scanner;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::NodeError;
use crate::message::Hello;
use crate::peer_info::PeerInfo;
use crate::types::Port;

/// What the receiver/scanner just did to a peer, for the caller to act on.
///
/// Promotions and demotions that refill or drain the `bi` quota need a
/// fresh discoverer run kicked off; everything else is a pure state
/// mutation the lock-holder can apply and move on from.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Outcome {
    None,
    SpawnDiscoverer,
}

/// The three-way classification plus per-peer bookkeeping for one node.
///
/// Lives behind a single [`Mutex`] (never held across an `.await`), so the
/// four activities observe a consistent partition of peers at every tick
/// (invariant I1 in the spec).
pub(crate) struct NodeState {
    port: Port,
    n: usize,
    unknown: IndexSet<Port>,
    uni: IndexSet<Port>,
    bi: IndexSet<Port>,
    peer_info: IndexMap<Port, PeerInfo>,
    disabled: bool,
    done: bool,
    /// Packets that failed to parse, or named a peer we weren't constructed
    /// with. Diagnostic only (§7); never changes classification.
    malformed_packets: u64,
}

impl NodeState {
    fn new(port: Port, other_ports: &[Port], n: usize) -> Self {
        let mut unknown = IndexSet::new();
        let mut peer_info = IndexMap::new();
        for &p in other_ports {
            unknown.insert(p);
            peer_info.insert(p, PeerInfo::default());
        }
        NodeState {
            port,
            n,
            unknown,
            uni: IndexSet::new(),
            bi: IndexSet::new(),
            peer_info,
            disabled: false,
            done: false,
            malformed_packets: 0,
        }
    }

    /// Move `peer` out of whichever of `unknown`/`uni` it currently occupies.
    fn remove_from_unknown_or_uni(&mut self, peer: Port) {
        self.unknown.shift_remove(&peer);
        self.uni.shift_remove(&peer);
    }

    fn promote_to_bi(&mut self, peer: Port, hello: &Hello, now: chrono::DateTime<Utc>) {
        self.remove_from_unknown_or_uni(peer);
        self.bi.insert(peer);
        if let Some(info) = self.peer_info.get_mut(&peer) {
            info.begin_connection(now);
            info.neighbours = hello.bi_neighbours.clone();
            info.packets_received += 1;
        }
        trace!(port = %self.port, peer = %peer, bi_len = self.bi.len(), "promoted peer to bi");
    }

    fn demote_bi_to_uni(&mut self, peer: Port, now: chrono::DateTime<Utc>) {
        self.bi.shift_remove(&peer);
        self.uni.insert(peer);
        if let Some(info) = self.peer_info.get_mut(&peer) {
            info.finalise_connection(now);
        }
        debug!(port = %self.port, peer = %peer, "demoted bi peer to uni");
    }

    /// Move a peer from `uni`/`bi` back to `unknown` on staleness or outage.
    ///
    /// Returns whether the peer was actually connected (`bi`), so the
    /// caller knows whether to refinalise its connection length.
    fn expire_to_unknown(&mut self, peer: Port) -> bool {
        let was_uni = self.uni.shift_remove(&peer);
        let was_bi = self.bi.shift_remove(&peer);
        if was_uni || was_bi {
            self.unknown.insert(peer);
            if let Some(info) = self.peer_info.get_mut(&peer) {
                info.neighbours.clear();
            }
        }
        was_bi
    }

    /// Apply the receive transition rules from §4.1 to one parsed datagram.
    fn handle_hello(&mut self, hello: &Hello, now: chrono::DateTime<Utc>) -> Outcome {
        let peer = hello.id;
        if !self.peer_info.contains_key(&peer) {
            self.malformed_packets += 1;
            return Outcome::None;
        }
        if let Some(info) = self.peer_info.get_mut(&peer) {
            info.last_received = Some(now);
        }
        let mutual = hello.advertises(self.port);

        if self.bi.contains(&peer) {
            if mutual {
                if let Some(info) = self.peer_info.get_mut(&peer) {
                    info.neighbours = hello.bi_neighbours.clone();
                    info.packets_received += 1;
                }
                Outcome::None
            } else {
                self.demote_bi_to_uni(peer, now);
                Outcome::SpawnDiscoverer
            }
        } else if self.bi.len() < self.n {
            if mutual {
                self.promote_to_bi(peer, hello, now);
                Outcome::None
            } else {
                if self.unknown.shift_remove(&peer) {
                    self.uni.insert(peer);
                }
                Outcome::None
            }
        } else {
            // |bi| == N and peer not in bi: starved, no classification change.
            Outcome::None
        }
    }

    /// Scan `uni` and `bi` for staleness; returns whether a discoverer run
    /// should be (re)spawned (true iff a `bi` peer expired).
    fn scan_for_staleness(&mut self, now: chrono::DateTime<Utc>, threshold: chrono::Duration) -> bool {
        let stale = |info: Option<&PeerInfo>| match info.and_then(|i| i.last_received) {
            Some(last) => now - last > threshold,
            None => false,
        };

        let stale_uni: Vec<Port> = self
            .uni
            .iter()
            .copied()
            .filter(|p| stale(self.peer_info.get(p)))
            .collect();
        for peer in stale_uni {
            self.expire_to_unknown(peer);
        }

        let stale_bi: Vec<Port> = self
            .bi
            .iter()
            .copied()
            .filter(|p| stale(self.peer_info.get(p)))
            .collect();
        let mut any_bi_expired = false;
        for peer in stale_bi {
            let was_bi = self.expire_to_unknown(peer);
            if was_bi {
                if let Some(info) = self.peer_info.get_mut(&peer) {
                    info.finalise_connection(now);
                }
                any_bi_expired = true;
            }
        }
        any_bi_expired
    }

    /// Peers the beaconer should broadcast to this tick.
    fn beacon_targets(&self) -> Vec<Port> {
        if self.bi.len() >= self.n {
            self.bi.iter().copied().collect()
        } else {
            self.bi.iter().chain(self.uni.iter()).copied().collect()
        }
    }

    /// A random nominee for the discoverer, or `None` if nothing to probe.
    fn pick_nominee(&self) -> Option<Port> {
        use rand::seq::SliceRandom;
        let mut pool: Vec<Port> = self.unknown.iter().copied().collect();
        if pool.is_empty() {
            pool = self.uni.iter().chain(self.unknown.iter()).copied().collect();
        }
        pool.choose(&mut rand::thread_rng()).copied()
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn bi_quota_met(&self) -> bool {
        self.bi.len() >= self.n
    }

    fn count_malformed(&mut self) {
        self.malformed_packets += 1;
    }

    fn assert_partition(&self) {
        let mut seen = HashSet::new();
        for p in self.unknown.iter().chain(self.uni.iter()).chain(self.bi.iter()) {
            debug_assert!(seen.insert(*p), "peer {p} present in more than one set");
        }
    }
}

/// Shared state every spawned activity holds a clone of.
pub(crate) struct Inner {
    pub(crate) port: Port,
    pub(crate) config: Config,
    pub(crate) socket: UdpSocket,
    pub(crate) state: Mutex<NodeState>,
    pub(crate) shutdown: watch::Sender<bool>,
}

/// A single simulated overlay participant.
pub struct Node {
    inner: Arc<Inner>,
    shutdown_rx: watch::Receiver<bool>,
    started: Arc<AtomicBool>,
}

/// The log/topology payload produced by [`Node::snapshot`].
pub struct Snapshot {
    pub port: Port,
    pub connected: Vec<ConnectedNeighbour>,
    pub current_neighbours: Vec<Port>,
    pub availability: Vec<(Port, f64)>,
    pub vertices: Vec<Port>,
    pub edges: Vec<(Port, Port)>,
    /// Diagnostic only (§7): datagrams discarded for failing to parse or
    /// naming a peer this node wasn't constructed with. Not part of the
    /// persisted log schema in §6.
    pub malformed_packets: u64,
}

pub struct ConnectedNeighbour {
    pub port: Port,
    pub packets_received: u64,
    pub packets_sent: u64,
}

impl Node {
    /// Bind a fresh UDP socket on `port` and construct the node's initial
    /// state: every port in `other_ports` starts out `unknown`.
    pub async fn bind(port: Port, other_ports: Vec<Port>, n: usize, config: Config) -> Result<Self, NodeError> {
        let socket = UdpSocket::bind(port.socket_addr())
            .await
            .map_err(|source| NodeError::Bind { port: port.0, source })?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = Arc::new(Inner {
            port,
            config,
            socket,
            state: Mutex::new(NodeState::new(port, &other_ports, n)),
            shutdown: shutdown_tx,
        });
        Ok(Node {
            inner,
            shutdown_rx,
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn port(&self) -> Port {
        self.inner.port
    }

    /// Begin the receiver, beaconer, discoverer, and scanner, then issue
    /// the initial broadcast. Idempotent: a second call is a no-op.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(receiver::run(self.inner.clone(), self.shutdown_rx.clone()));
        tokio::spawn(beaconer::run(self.inner.clone(), self.shutdown_rx.clone()));
        tokio::spawn(discoverer::run(self.inner.clone(), self.shutdown_rx.clone()));
        tokio::spawn(scanner::run(self.inner.clone(), self.shutdown_rx.clone()));

        let initial: Vec<Port> = {
            let state = self.inner.state.lock().unwrap();
            state
                .unknown
                .iter()
                .chain(state.uni.iter())
                .chain(state.bi.iter())
                .copied()
                .collect()
        };
        send_hello_to(&self.inner, &initial).await;
    }

    /// Enter outage: `uni ∪ bi` return to `unknown` with set semantics,
    /// in-progress connection lengths are finalised, and sends/receives
    /// are suppressed until [`Node::resume`].
    pub fn stop(&self) {
        let now = Utc::now();
        let mut state = self.inner.state.lock().unwrap();
        state.disabled = true;

        let leaving_bi: Vec<Port> = state.bi.iter().copied().collect();
        for peer in &leaving_bi {
            if let Some(info) = state.peer_info.get_mut(peer) {
                info.finalise_connection(now);
            }
        }

        let returning: Vec<Port> = state.uni.iter().copied().chain(state.bi.iter().copied()).collect();
        state.uni.clear();
        state.bi.clear();
        for peer in returning {
            state.unknown.insert(peer);
        }
        state.assert_partition();
    }

    /// Clear the outage flag and kick off a fresh discoverer run.
    pub fn resume(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.disabled = false;
        }
        tokio::spawn(discoverer::run(self.inner.clone(), self.shutdown_rx.clone()));
    }

    /// End the node: all loops exit within their next tick.
    pub fn terminate(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.done = true;
        }
        let _ = self.inner.shutdown.send(true);
    }

    /// Produce the log/topology payload described in §6.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock().unwrap();
        let lifetime = state_lifetime_secs(&self.inner.config);

        let mut connected = Vec::new();
        let mut availability = Vec::new();
        let mut vertices = Vec::new();
        // A `BTreeSet` dedupes edges that multiple gossiping peers agree on
        // and keeps the final list in a deterministic order.
        let mut edge_set: std::collections::BTreeSet<(Port, Port)> = std::collections::BTreeSet::new();

        for (&peer, info) in state.peer_info.iter() {
            vertices.push(peer);
            if info.became_neighbour {
                connected.push(ConnectedNeighbour {
                    port: peer,
                    packets_received: info.packets_received,
                    packets_sent: info.packets_sent,
                });
                let fraction = (info.connection_length.num_milliseconds() as f64 / 1000.0) / lifetime;
                availability.push((peer, round2(fraction)));
            }
            for &neighbour in info.neighbours.iter() {
                if neighbour != state.port {
                    edge_set.insert((peer, neighbour));
                    edge_set.insert((neighbour, peer));
                }
            }
        }

        for &peer in state.uni.iter() {
            edge_set.insert((state.port, peer));
        }
        for &peer in state.bi.iter() {
            edge_set.insert((state.port, peer));
            edge_set.insert((peer, state.port));
        }
        let edges: Vec<(Port, Port)> = edge_set.into_iter().collect();

        Snapshot {
            port: state.port,
            connected,
            current_neighbours: state.bi.iter().copied().collect(),
            availability,
            vertices,
            edges,
            malformed_packets: state.malformed_packets,
        }
    }
}

fn state_lifetime_secs(config: &Config) -> f64 {
    config.simulation_lifetime.as_secs_f64()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Serialize, size-check, and send one "Hello" to each destination,
/// recomputing the per-destination `lastSent`/`lastReceived` fields and
/// bookkeeping the send under the same lock (§4.1 message format).
pub(crate) async fn send_hello_to(inner: &Arc<Inner>, destinations: &[Port]) {
    for &dest in destinations {
        let hello = {
            let state = inner.state.lock().unwrap();
            let uni_neighbours: Vec<Port> = state.uni.iter().copied().collect();
            let bi_neighbours: Vec<Port> = state.bi.iter().copied().collect();
            let (last_sent, last_received) = state
                .peer_info
                .get(&dest)
                .map(PeerInfo::wire_timestamps)
                .unwrap_or((None, None));
            Hello::new(state.port, uni_neighbours, bi_neighbours, last_sent, last_received)
        };

        match serde_json::to_vec(&hello) {
            Ok(bytes) => {
                if bytes.len() > crate::constants::MAX_DATAGRAM_SIZE {
                    debug!(dest = %dest, len = bytes.len(), "dropping oversized datagram");
                    continue;
                }
                if let Err(error) = inner.socket.send_to(&bytes, dest.socket_addr()).await {
                    debug!(dest = %dest, %error, "send failed");
                    continue;
                }
                let now = Utc::now();
                let mut state = inner.state.lock().unwrap();
                // Re-check bi-membership now, under the lock: the peer may
                // have been demoted while the send was in flight.
                let is_bi = state.bi.contains(&dest);
                if let Some(info) = state.peer_info.get_mut(&dest) {
                    info.last_sent = Some(now);
                    if is_bi {
                        info.packets_sent += 1;
                    }
                }
            }
            Err(error) => {
                debug!(dest = %dest, %error, "failed to serialize Hello");
            }
        }
    }
}
