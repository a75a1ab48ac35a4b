//! Runtime-overridable simulation parameters.
//!
//! CORE logic never hard-codes a duration or probability: it reads
//! [`Config`], which defaults to the literal values the spec names in
//! `constants.rs`. Tests shrink these so the six end-to-end scenarios in
//! the spec run in wall-clock seconds instead of minutes.

use std::time::Duration;

use crate::constants;

/// Simulation-wide parameters, overridable for tests.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub beacon_period: Duration,
    pub discovery_period: Duration,
    pub scan_period: Duration,
    pub staleness_threshold: Duration,
    pub churn_interval: Duration,
    pub churn_outage: Duration,
    pub simulation_lifetime: Duration,
    pub packet_loss_probability: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            beacon_period: constants::BEACON_PERIOD,
            discovery_period: constants::DISCOVERY_PERIOD,
            scan_period: constants::SCAN_PERIOD,
            staleness_threshold: constants::STALENESS_THRESHOLD,
            churn_interval: constants::CHURN_INTERVAL,
            churn_outage: constants::CHURN_OUTAGE,
            simulation_lifetime: constants::SIMULATION_LIFETIME,
            packet_loss_probability: constants::PACKET_LOSS_PROBABILITY,
        }
    }
}

impl Config {
    /// A config with every timer shrunk by `factor` and loss disabled,
    /// for deterministic fast-converging integration tests.
    pub fn shrunk(factor: u32) -> Self {
        let shrink = |d: Duration| d / factor;
        Config {
            beacon_period: shrink(constants::BEACON_PERIOD),
            discovery_period: shrink(constants::DISCOVERY_PERIOD),
            scan_period: shrink(constants::SCAN_PERIOD),
            staleness_threshold: shrink(constants::STALENESS_THRESHOLD),
            churn_interval: shrink(constants::CHURN_INTERVAL),
            churn_outage: shrink(constants::CHURN_OUTAGE),
            simulation_lifetime: shrink(constants::SIMULATION_LIFETIME),
            packet_loss_probability: 0.0,
        }
    }

    /// Override the packet loss probability (used by the lossy-link scenario).
    pub fn with_packet_loss(mut self, probability: f64) -> Self {
        self.packet_loss_probability = probability;
        self
    }
}
