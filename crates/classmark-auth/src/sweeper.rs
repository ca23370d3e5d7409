use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::service::TokenService;

/// Spawns the background task that deletes expired tokens every `period`.
///
/// A failed sweep is logged and retried on the next tick.
pub fn spawn_expiry_sweeper(service: TokenService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match service.sweep_expired().await {
                Ok(removed) => debug!(removed, "Expired tokens swept"),
                Err(e) => warn!(error = %e, "Expired token sweep failed"),
            }
        }
    })
}
