//! The beaconer activity: periodically broadcasts "Hello" to current neighbours.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time;

use super::{send_hello_to, Inner};

/// Run until `done`, sleeping `config.beacon_period` between broadcasts.
pub(crate) async fn run(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval(inner.config.beacon_period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }

        let (done, disabled, targets) = {
            let state = inner.state.lock().unwrap();
            (state.is_done(), state.is_disabled(), state.beacon_targets())
        };
        if done {
            return;
        }
        if disabled {
            continue;
        }
        send_hello_to(&inner, &targets).await;
    }
}
