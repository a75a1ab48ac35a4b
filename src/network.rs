//! Network: port allocation, node orchestration, churn injection, and the
//! final log/topology emission (§4.2 of the spec).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{PORT_RANGE_END, PORT_RANGE_SIZE, PORT_RANGE_START};
use crate::error::NetworkError;
use crate::log;
use crate::node::Node;
use crate::topology::{DotTopologySink, TopologySink};
use crate::types::Port;

/// Allocates `num_of_nodes` distinct ports from `[PORT_RANGE_START, PORT_RANGE_END]`
/// uniformly at random, without replacement.
fn allocate_ports(num_of_nodes: usize) -> Result<Vec<Port>, NetworkError> {
    if num_of_nodes > PORT_RANGE_SIZE {
        return Err(NetworkError::PortRangeExhausted {
            requested: num_of_nodes,
            available: PORT_RANGE_SIZE,
        });
    }
    let mut pool: Vec<Port> = (PORT_RANGE_START..=PORT_RANGE_END).map(Port).collect();
    pool.shuffle(&mut rand::thread_rng());
    pool.truncate(num_of_nodes);
    Ok(pool)
}

/// Orchestrates a full overlay simulation: node construction, churn, and
/// the final snapshot/log emission.
pub struct Network {
    num_of_nodes: usize,
    n: usize,
    config: Config,
    logs_root: PathBuf,
}

impl Network {
    pub fn new(num_of_nodes: usize, n: usize) -> Self {
        Self::with_config(num_of_nodes, n, Config::default())
    }

    pub fn with_config(num_of_nodes: usize, n: usize, config: Config) -> Self {
        Network {
            num_of_nodes,
            n,
            config,
            logs_root: PathBuf::from("logs"),
        }
    }

    /// Write logs somewhere other than `./logs` (used by tests).
    pub fn with_logs_root(mut self, logs_root: impl Into<PathBuf>) -> Self {
        self.logs_root = logs_root.into();
        self
    }

    /// Allocate ports and bind every node, but do not start their activities.
    ///
    /// Exposed separately from [`Network::run`] so tests can start nodes,
    /// poke `stop`/`resume`, and inspect `snapshot()` mid-run without
    /// waiting out the full 5-minute production lifecycle.
    pub async fn build_nodes(&self) -> Result<Vec<Arc<Node>>, NetworkError> {
        let ports = allocate_ports(self.num_of_nodes)?;
        let mut nodes = Vec::with_capacity(ports.len());
        for (i, &port) in ports.iter().enumerate() {
            let others: Vec<Port> = ports
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| *p)
                .collect();
            let node = Node::bind(port, others, self.n, self.config).await?;
            nodes.push(Arc::new(node));
        }
        Ok(nodes)
    }

    /// Start every node concurrently on its own task and wait for each
    /// node's initial broadcast to go out.
    pub async fn start_all(nodes: &[Arc<Node>]) {
        let handles = nodes.iter().cloned().map(|node| {
            tokio::spawn(async move {
                node.start().await;
            })
        });
        for handle in futures::future::join_all(handles).await {
            if let Err(error) = handle {
                warn!(%error, "node start task panicked");
            }
        }
    }

    /// Run the churn loop until `deadline`: every `config.churn_interval`,
    /// disable a uniformly random node and schedule its resume
    /// `config.churn_outage` later. Overlapping churn (a node disabled
    /// again before its resume timer fires) is permitted; the later timer
    /// wins on the `disabled` flag.
    async fn run_churn(&self, nodes: &[Arc<Node>], deadline: Instant) {
        let mut ticker = time::interval(self.config.churn_interval);
        // the first tick fires immediately; skip it so churn starts one
        // interval after the simulation begins, matching the source.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = time::sleep_until(deadline) => return,
            }
            if Instant::now() >= deadline {
                return;
            }
            let index = rand::thread_rng().gen_range(0..nodes.len());
            let chosen = nodes[index].clone();
            info!(port = %chosen.port(), "churn: disabling node");
            chosen.stop();

            let outage = self.config.churn_outage;
            tokio::spawn(async move {
                time::sleep(outage).await;
                chosen.resume();
            });
        }
    }

    /// Terminate every node and write its log/topology snapshot.
    pub fn terminate_and_log(&self, nodes: &[Arc<Node>]) -> Result<(), NetworkError> {
        for node in nodes {
            node.terminate();
        }
        self.write_logs(nodes, &DotTopologySink)
    }

    fn write_logs(&self, nodes: &[Arc<Node>], sink: &dyn TopologySink) -> Result<(), NetworkError> {
        log::reset_logs_dir(&self.logs_root)?;
        for node in nodes {
            let snapshot = node.snapshot();
            log::write_snapshot(&self.logs_root, &snapshot, sink)?;
        }
        Ok(())
    }

    pub fn logs_root(&self) -> &Path {
        &self.logs_root
    }

    /// Allocate ports, build nodes, start them, inject churn, and after
    /// `config.simulation_lifetime` terminate every node and emit logs.
    pub async fn run(&self) -> Result<(), NetworkError> {
        let nodes = self.build_nodes().await?;
        Self::start_all(&nodes).await;

        let deadline = Instant::now() + self.config.simulation_lifetime;
        self.run_churn(&nodes, deadline).await;

        self.terminate_and_log(&nodes)
    }
}
