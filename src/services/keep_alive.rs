use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum KeepAliveError {
    #[error("ping failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ping returned {0}")]
    Status(reqwest::StatusCode),
}

/// Handle to the background pinger. Dropping it leaves the task running.
pub struct KeepAliveHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl KeepAliveHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("keep-alive task ended abnormally: {e}");
        }
    }
}

/// Start pinging `self_url` every `interval`. The first ping happens one full
/// interval after start. Without a URL the task logs once and exits.
pub fn spawn(self_url: Option<String>, interval: Duration) -> KeepAliveHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(run(self_url, interval, token.clone()));
    KeepAliveHandle { token, task }
}

async fn run(self_url: Option<String>, interval: Duration, token: CancellationToken) {
    let Some(url) = self_url else {
        tracing::warn!("SELF_URL not set, keep-alive pings disabled");
        return;
    };

    let client = match reqwest::Client::builder().timeout(PING_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("keep-alive disabled, could not build http client: {e}");
            return;
        }
    };

    tracing::info!(%url, every = ?interval, "keep-alive started");

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                match ping(&client, &url).await {
                    Ok(status) => tracing::debug!(%status, "keep-alive ping ok"),
                    Err(e) => tracing::warn!(%url, "keep-alive ping failed: {e}"),
                }
            }
        }
    }

    tracing::info!("keep-alive stopped");
}

pub async fn ping(client: &reqwest::Client, url: &str) -> Result<reqwest::StatusCode, KeepAliveError> {
    let status = client.get(url).send().await?.status();
    if status.is_success() {
        Ok(status)
    } else {
        Err(KeepAliveError::Status(status))
    }
}
