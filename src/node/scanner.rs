//! The scanner activity: evicts stale peers on a fixed timeout.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;

use super::{discoverer, Inner};

pub(crate) async fn run(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval(inner.config.scan_period);
    let threshold = chrono::Duration::from_std(inner.config.staleness_threshold)
        .expect("staleness threshold fits in a chrono::Duration");
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }

        let (done, disabled, spawn_discoverer) = {
            let mut state = inner.state.lock().unwrap();
            if state.is_done() {
                (true, false, false)
            } else if state.is_disabled() {
                (false, true, false)
            } else {
                let now = Utc::now();
                let spawn = state.scan_for_staleness(now, threshold);
                (false, false, spawn)
            }
        };
        if done {
            return;
        }
        if disabled {
            continue;
        }
        if spawn_discoverer {
            tokio::spawn(discoverer::run(inner.clone(), shutdown.clone()));
        }
    }
}
