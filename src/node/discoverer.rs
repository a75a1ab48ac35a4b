//! The discoverer activity: probes nominees until the bi quota is full.
//!
//! Multiple runs may be alive concurrently (spawned on `start`, `resume`,
//! bi-demotion, and bi-expiry); each observes the same quota and idles
//! out as soon as it is met, so overlap is harmless.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time;

use super::{send_hello_to, Inner};

pub(crate) async fn run(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval(inner.config.discovery_period);
    loop {
        {
            let state = inner.state.lock().unwrap();
            if state.is_done() || state.bi_quota_met() {
                return;
            }
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }

        let (done, disabled, nominee) = {
            let state = inner.state.lock().unwrap();
            (state.is_done(), state.is_disabled(), state.pick_nominee())
        };
        if done {
            return;
        }
        if disabled {
            continue;
        }
        if let Some(nominee) = nominee {
            send_hello_to(&inner, std::slice::from_ref(&nominee)).await;
        }
    }
}
