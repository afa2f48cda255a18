use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info};
use crate::manager::Collector;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            interval: Duration::from_secs(30 * 60),
        }
    }
}

/// Fires `collector.run()` after the initial delay and then on every
/// interval tick until `shutdown` resolves. A run that outlives the interval
/// overlaps with the next one. Returns the number of runs started.
pub async fn run_periodic<F>(collector: Arc<Collector>, config: ScheduleConfig, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        _ = &mut shutdown => return 0,
        _ = sleep(config.initial_delay) => {}
    }

    let mut ticker = interval(config.interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = JoinSet::new();
    let mut started = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                started += 1;
                info!(run = started, in_flight = runs.len(), "starting collection run");
                let collector = collector.clone();
                runs.spawn(async move { collector.run().await });
            }
            Some(finished) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = finished {
                    error!(error = %e, "collection run crashed");
                }
            }
        }
    }

    info!(started, in_flight = runs.len(), "scheduler stopped");
    runs.abort_all();
    started
}
