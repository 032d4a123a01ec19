use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ApiClient;

/// How often the backend is pinged.
/// The hosted backend suspends after roughly 15 minutes without traffic.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Periodic `GET /ping` so an idle backend instance is not suspended.
///
/// Failures are logged and otherwise ignored. The task stops when the handle
/// is cancelled or dropped.
#[derive(Debug)]
pub struct KeepAlive {
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Start pinging every [`KEEP_ALIVE_INTERVAL`]. The first ping happens
    /// one interval after start.
    pub fn spawn(client: ApiClient) -> Self {
        Self::with_interval(client, KEEP_ALIVE_INTERVAL)
    }

    pub fn with_interval(client: ApiClient, period: Duration) -> Self {
        info!(interval_secs = period.as_secs(), "Starting keep-alive");
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match client.ping().await {
                    Ok(_) => debug!("Server pinged successfully"),
                    Err(e) => warn!(error = %e, "Ping failed"),
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
