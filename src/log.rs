//! Per-node log/topology snapshot persistence (§6 of the spec).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::NetworkError;
use crate::node::Snapshot;
use crate::topology::TopologySink;
use crate::types::Port;

#[derive(Serialize)]
struct ConnectedEntry {
    #[serde(rename = "IP")]
    ip: String,
    #[serde(rename = "Port")]
    port: Port,
    #[serde(rename = "Number of Received Packets")]
    packets_received: u64,
    #[serde(rename = "Number of Sent Packets")]
    packets_sent: u64,
}

#[derive(Serialize)]
struct EdgeEntry {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "To")]
    to: String,
}

#[derive(Serialize)]
struct TopologyEntry {
    #[serde(rename = "Vertexes")]
    vertexes: Vec<Port>,
    #[serde(rename = "Edges")]
    edges: Vec<EdgeEntry>,
}

/// The exact JSON shape written to `port_<P>_logs.json`.
#[derive(Serialize)]
pub struct LogFile {
    #[serde(rename = "Neighbours That Got Connected")]
    connected: Vec<ConnectedEntry>,
    #[serde(rename = "Current Neighbours")]
    current_neighbours: Vec<Port>,
    #[serde(rename = "Other Nodes Availability")]
    availability: BTreeMap<String, f64>,
    #[serde(rename = "Topology")]
    topology: TopologyEntry,
}

impl LogFile {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let connected = snapshot
            .connected
            .iter()
            .map(|c| ConnectedEntry {
                ip: "127.0.0.1".to_string(),
                port: c.port,
                packets_received: c.packets_received,
                packets_sent: c.packets_sent,
            })
            .collect();

        let availability = snapshot
            .availability
            .iter()
            .map(|(port, fraction)| (port.0.to_string(), *fraction))
            .collect();

        let edges = snapshot
            .edges
            .iter()
            .map(|(from, to)| EdgeEntry {
                from: from.address_form(),
                to: to.address_form(),
            })
            .collect();

        LogFile {
            connected,
            current_neighbours: snapshot.current_neighbours.clone(),
            availability,
            topology: TopologyEntry {
                vertexes: snapshot.vertices.clone(),
                edges,
            },
        }
    }
}

/// Create `logs/port_<P>/`, write `port_<P>_logs.json`, and hand the
/// snapshot's vertex/edge lists to `sink` for the topology rendering.
pub fn write_snapshot(
    logs_root: &Path,
    snapshot: &Snapshot,
    sink: &dyn TopologySink,
) -> Result<(), NetworkError> {
    let port = snapshot.port;
    let node_dir = logs_root.join(format!("port_{}", port.0));
    fs::create_dir_all(&node_dir).map_err(|source| NetworkError::LogEmission { port: port.0, source })?;

    let log_file = LogFile::from_snapshot(snapshot);
    let json = serde_json::to_vec_pretty(&log_file)
        .expect("LogFile always serializes: it contains no maps with non-string keys or NaN floats");
    fs::write(node_dir.join(format!("port_{}_logs.json", port.0)), json)
        .map_err(|source| NetworkError::LogEmission { port: port.0, source })?;

    sink.render(port, &snapshot.vertices, &snapshot.edges, &node_dir)
        .map_err(|_| NetworkError::LogEmission {
            port: port.0,
            source: std::io::Error::new(std::io::ErrorKind::Other, "topology rendering failed"),
        })?;

    Ok(())
}

/// Recreate `logs/` from scratch, removing any prior contents.
pub fn reset_logs_dir(logs_root: &Path) -> Result<(), NetworkError> {
    if logs_root.exists() {
        fs::remove_dir_all(logs_root).map_err(|source| NetworkError::LogEmission { port: 0, source })?;
    }
    fs::create_dir_all(logs_root).map_err(|source| NetworkError::LogEmission { port: 0, source })?;
    Ok(())
}
