//! End-to-end scenarios from §8 of the spec, run against real loopback
//! UDP sockets with every timer shrunk so they finish in real time.

use std::sync::OnceLock;
use std::time::Duration;

use overlay_net::config::Config;
use overlay_net::network::Network;

/// Every spec timing constant shrunk by this factor for the test suite.
const SHRINK: u32 = 20;

fn test_config() -> Config {
    Config::shrunk(SHRINK)
}

fn scaled(spec_seconds: u64) -> Duration {
    Duration::from_millis(spec_seconds * 1000 / SHRINK as u64)
}

/// Port allocation draws from the same `[10000, 11000]` pool in every
/// test; serialize the bind step only (not the whole test body) so
/// concurrently-running tests can't race each other onto the same port.
fn port_alloc_lock() -> &'static tokio::sync::Mutex<()> {
    static LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| tokio::sync::Mutex::new(()))
}

async fn build_nodes(network: &Network) -> Vec<std::sync::Arc<overlay_net::node::Node>> {
    let _guard = port_alloc_lock().lock().await;
    network.build_nodes().await.expect("bind nodes")
}

#[tokio::test(flavor = "multi_thread")]
async fn two_node_convergence() {
    let network = Network::with_config(2, 1, test_config());
    let nodes = build_nodes(&network).await;
    Network::start_all(&nodes).await;

    tokio::time::sleep(scaled(6)).await;

    for node in &nodes {
        let snapshot = node.snapshot();
        assert_eq!(
            snapshot.current_neighbours.len(),
            1,
            "port {} should have exactly one bi neighbour",
            node.port()
        );
    }

    for node in &nodes {
        node.terminate();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn three_node_triangle() {
    let network = Network::with_config(3, 2, test_config());
    let nodes = build_nodes(&network).await;
    Network::start_all(&nodes).await;

    tokio::time::sleep(scaled(10)).await;

    for node in &nodes {
        let snapshot = node.snapshot();
        assert_eq!(
            snapshot.current_neighbours.len(),
            2,
            "port {} should see both other nodes as bi neighbours",
            node.port()
        );
    }

    for node in &nodes {
        node.terminate();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn degree_cap_never_exceeded() {
    let network = Network::with_config(5, 2, test_config());
    let nodes = build_nodes(&network).await;
    Network::start_all(&nodes).await;

    for _ in 0..5 {
        tokio::time::sleep(scaled(4)).await;
        for node in &nodes {
            let snapshot = node.snapshot();
            assert!(
                snapshot.current_neighbours.len() <= 2,
                "port {} exceeded the degree cap: {:?}",
                node.port(),
                snapshot.current_neighbours
            );
        }
    }

    for node in &nodes {
        node.terminate();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn outage_eviction_and_recovery() {
    let network = Network::with_config(3, 2, test_config());
    let nodes = build_nodes(&network).await;
    Network::start_all(&nodes).await;

    tokio::time::sleep(scaled(5)).await;
    let a = nodes[0].clone();
    let a_port = a.port();
    a.stop();

    tokio::time::sleep(scaled(10)).await;

    let a_snapshot = a.snapshot();
    assert!(a_snapshot.current_neighbours.is_empty(), "A should have no bi neighbours while disabled");
    assert!(
        a_snapshot
            .connected
            .iter()
            .any(|c| c.port != a_port),
        "A should retain becameNeighbour history for peers it had already reached"
    );
    for node in &nodes[1..] {
        let snapshot = node.snapshot();
        assert!(
            !snapshot.current_neighbours.contains(&a_port),
            "port {} should have evicted disabled A from its bi set",
            node.port()
        );
    }

    a.resume();
    tokio::time::sleep(scaled(15)).await;

    let a_snapshot = a.snapshot();
    assert!(
        !a_snapshot.current_neighbours.is_empty(),
        "A should have reconnected to at least one peer after resume"
    );

    for node in &nodes {
        node.terminate();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn lossy_link_still_converges() {
    let config = Config::shrunk(SHRINK).with_packet_loss(0.5);
    let network = Network::with_config(3, 2, config);
    let nodes = build_nodes(&network).await;
    Network::start_all(&nodes).await;

    tokio::time::sleep(scaled(60)).await;

    for node in &nodes {
        let snapshot = node.snapshot();
        assert_eq!(
            snapshot.current_neighbours.len(),
            2,
            "port {} should still converge to 2 bi neighbours despite 50% loss",
            node.port()
        );
    }

    for node in &nodes {
        node.terminate();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshot_round_trips_through_json() {
    let network = Network::with_config(2, 1, test_config());
    let nodes = build_nodes(&network).await;
    Network::start_all(&nodes).await;
    tokio::time::sleep(scaled(6)).await;

    for node in &nodes {
        let snapshot = node.snapshot();
        let log_file = overlay_net::log::LogFile::from_snapshot(&snapshot);
        let encoded = serde_json::to_vec(&log_file).expect("serialize log file");
        let value: serde_json::Value = serde_json::from_slice(&encoded).expect("decode json");
        let re_encoded = serde_json::to_vec(&value).expect("round-trip encode");
        let re_decoded: serde_json::Value = serde_json::from_slice(&re_encoded).expect("round-trip decode");
        assert_eq!(value, re_decoded);
        assert!(value.get("Topology").is_some());
        assert!(value.get("Current Neighbours").is_some());
    }

    for node in &nodes {
        node.terminate();
    }
}

#[test]
fn port_range_exhaustion_is_fatal() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let network = Network::new(2000, 2);
    let result = runtime.block_on(network.build_nodes());
    assert!(result.is_err());
}

