//! The receiver activity: consumes datagrams and mutates classification.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tracing::trace;

use crate::constants::MAX_DATAGRAM_SIZE;
use crate::message::Hello;

use super::{discoverer, Inner, Outcome};

/// Run until `done`. Races the blocking receive against the shutdown
/// signal so termination is observed within one packet or one wake,
/// per the spec's cancellation requirements.
pub(crate) async fn run(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        if *shutdown.borrow() {
            return;
        }

        let (len, _addr) = tokio::select! {
            result = inner.socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(error) => {
                    trace!(port = %inner.port, %error, "recv_from failed");
                    continue;
                }
            },
            _ = shutdown.changed() => {
                return;
            }
        };

        if *shutdown.borrow() {
            return;
        }

        let disabled = inner.state.lock().unwrap().is_disabled();
        if disabled {
            // Outage: drain the socket but do not service the packet.
            continue;
        }

        // Simulated link loss (§4.1 step 1): modelled even on loopback.
        if rand::thread_rng().gen_range(0.0..1.0) < inner.config.packet_loss_probability {
            continue;
        }

        let hello: Hello = match serde_json::from_slice(&buf[..len]) {
            Ok(hello) => hello,
            Err(error) => {
                trace!(port = %inner.port, %error, "discarding malformed datagram");
                inner.state.lock().unwrap().count_malformed();
                continue;
            }
        };

        let now = Utc::now();
        let outcome = inner.state.lock().unwrap().handle_hello(&hello, now);
        if outcome == Outcome::SpawnDiscoverer {
            tokio::spawn(discoverer::run(inner.clone(), shutdown.clone()));
        }
    }
}
