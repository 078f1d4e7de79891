use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically pings an external URL, e.g. to keep a free hosting tier awake.
///
/// Runs on its own task and knows nothing about pastes.
pub struct HealthPinger {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl HealthPinger {
    pub fn spawn(client: reqwest::Client, url: String, period: Duration) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(client, url, period, token.clone()));
        HealthPinger { token, handle }
    }

    /// Stop pinging and wait for the task to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(error) = self.handle.await {
            warn!("health pinger task failed: {error}");
        }
    }
}

async fn run(client: reqwest::Client, url: String, period: Duration, token: CancellationToken) {
    info!("pinging {url} every {}s", period.as_secs());

    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticks.tick() => ping(&client, &url).await,
        }
    }

    debug!("health pinger stopped");
}

async fn ping(client: &reqwest::Client, url: &str) {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("ping ok: {}", response.status())
        }
        Ok(response) => warn!("ping to {url} returned {}", response.status()),
        Err(error) => warn!("ping to {url} failed: {error}"),
    }
}
