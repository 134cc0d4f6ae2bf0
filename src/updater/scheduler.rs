//! Periodic trigger for the link updater.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use super::LinkUpdater;

/// Runs an update cycle at a fixed interval.
pub struct UpdaterScheduler {
    updater: Arc<LinkUpdater>,
    check_interval: Duration,
}

impl UpdaterScheduler {
    /// Create a scheduler.
    pub fn new(updater: Arc<LinkUpdater>, interval_secs: u64) -> Self {
        Self {
            updater,
            check_interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Interval between cycles.
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run the updater loop.
    ///
    /// The first cycle starts immediately. A cycle that overruns the
    /// interval delays the next one instead of triggering a burst.
    pub async fn run(&self) {
        info!(
            "Link updater started (check interval: {} seconds)",
            self.check_interval.as_secs()
        );

        let mut timer = interval(self.check_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            if let Err(e) = self.updater.run_update_cycle_report().await {
                error!("Update cycle failed: {}", e);
            }
        }
    }
}

/// Start the link updater as a background task.
pub fn start_link_updater(updater: Arc<LinkUpdater>, interval_secs: u64) -> JoinHandle<()> {
    let scheduler = UpdaterScheduler::new(updater, interval_secs);
    tokio::spawn(async move {
        scheduler.run().await;
    })
}
