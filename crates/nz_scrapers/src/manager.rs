use nz_core::{AnalysisModel, Datastore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};
use crate::breaker::QuotaBreaker;
use crate::scrapers::{ContentExtractor, NewsSearch};
use crate::task::{EnrichmentTask, SkipReason, TaskContext, TaskOutcome};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub candidates_per_category: usize,
    /// Wall-clock bound for a whole run, searches included.
    pub deadline: Duration,
    pub min_content_chars: usize,
    pub max_concurrent_tasks: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            candidates_per_category: 10,
            deadline: Duration::from_secs(25 * 60),
            min_content_chars: 10,
            max_concurrent_tasks: 16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub categories: usize,
    pub search_failures: usize,
    pub candidates: usize,
    pub persisted: usize,
    pub notifications: usize,
    pub skips: BTreeMap<SkipReason, usize>,
    /// Tasks that panicked; counted apart from ordinary skips.
    pub crashed: usize,
    /// Tasks still running when the deadline hit.
    pub abandoned: usize,
    pub quota_tripped: bool,
}

impl RunReport {
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skips.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.skips.values().sum()
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Persisted { notified, .. } => {
                self.persisted += 1;
                self.notifications += notified;
            }
            TaskOutcome::Skipped(reason) => *self.skips.entry(reason).or_insert(0) += 1,
        }
    }

    fn settle(&mut self, joined: std::result::Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.record(outcome),
            Err(e) => {
                error!(error = %e, "enrichment task crashed");
                self.crashed += 1;
            }
        }
    }
}

/// Records tasks that already finished, then aborts the rest and counts
/// them as abandoned.
fn abandon_unfinished(tasks: &mut JoinSet<TaskOutcome>, report: &mut RunReport) {
    while let Some(joined) = tasks.try_join_next() {
        report.settle(joined);
    }
    report.abandoned = tasks.len();
    if report.abandoned > 0 {
        warn!(abandoned = report.abandoned, "run deadline reached, abandoning unfinished tasks");
    }
    tasks.abort_all();
}

/// Drives one collection run: categories, searches, one enrichment task
/// per candidate, all bounded by the run deadline.
pub struct Collector {
    search: Arc<dyn NewsSearch>,
    extractor: Arc<dyn ContentExtractor>,
    model: Arc<dyn AnalysisModel>,
    store: Arc<dyn Datastore>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(
        search: Arc<dyn NewsSearch>,
        extractor: Arc<dyn ContentExtractor>,
        model: Arc<dyn AnalysisModel>,
        store: Arc<dyn Datastore>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            search,
            extractor,
            model,
            store,
            config,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Never fails; everything that goes wrong shows up in the report.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        let deadline = started + self.config.deadline;
        let breaker = Arc::new(QuotaBreaker::new());
        let mut report = RunReport::default();

        let categories = match self.store.list_active_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                error!(error = %e, "failed to list active categories");
                return report;
            }
        };
        if categories.is_empty() {
            info!("no categories active for collection");
            return report;
        }
        report.categories = categories.len();

        let ctx = Arc::new(TaskContext {
            extractor: self.extractor.clone(),
            model: self.model.clone(),
            store: self.store.clone(),
            breaker: breaker.clone(),
            min_content_chars: self.config.min_content_chars,
        });
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_tasks.max(1)));
        let mut tasks = JoinSet::new();

        for category in categories {
            let search = self.search.search(&category.name, self.config.candidates_per_category);
            let items = match timeout_at(deadline, search).await {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    warn!(category = %category.name, error = %e, "search failed, no candidates for category");
                    report.search_failures += 1;
                    continue;
                }
                Err(_) => {
                    warn!(category = %category.name, "deadline reached while searching");
                    break;
                }
            };

            info!(category = %category.name, count = items.len(), "candidates found");
            report.candidates += items.len();

            for item in items {
                let task = EnrichmentTask::new(item, category.clone(), ctx.clone());
                let semaphore = semaphore.clone();
                tasks.spawn(async move {
                    // the semaphore is never closed, so this only waits
                    let _permit = semaphore.acquire().await;
                    task.run().await
                });
            }
        }

        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => report.settle(joined),
                Ok(None) => break,
                Err(_) => {
                    abandon_unfinished(&mut tasks, &mut report);
                    break;
                }
            }
        }

        report.quota_tripped = breaker.is_tripped();
        info!(
            categories = report.categories,
            candidates = report.candidates,
            persisted = report.persisted,
            notifications = report.notifications,
            skipped = report.total_skipped(),
            search_failures = report.search_failures,
            abandoned = report.abandoned,
            quota_tripped = report.quota_tripped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection run finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = RunReport::default();
        report.record(TaskOutcome::Persisted { article_id: 1, notified: 3 });
        report.record(TaskOutcome::Skipped(SkipReason::ContentTooShort));
        report.record(TaskOutcome::Skipped(SkipReason::ContentTooShort));
        report.record(TaskOutcome::Skipped(SkipReason::AlreadyCollected));

        assert_eq!(report.persisted, 1);
        assert_eq!(report.notifications, 3);
        assert_eq!(report.skipped(SkipReason::ContentTooShort), 2);
        assert_eq!(report.skipped(SkipReason::QuotaOpen), 0);
        assert_eq!(report.total_skipped(), 3);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_not_counted_as_abandoned() {
        let mut tasks = JoinSet::new();
        tasks.spawn(async { TaskOutcome::Persisted { article_id: 7, notified: 2 } });
        tasks.spawn(async { TaskOutcome::Skipped(SkipReason::AlreadyCollected) });
        tasks.spawn(std::future::pending::<TaskOutcome>());
        // let the two ready tasks run to completion without joining them
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let mut report = RunReport::default();
        abandon_unfinished(&mut tasks, &mut report);

        assert_eq!(report.persisted, 1);
        assert_eq!(report.notifications, 2);
        assert_eq!(report.skipped(SkipReason::AlreadyCollected), 1);
        assert_eq!(report.abandoned, 1);
    }

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert_eq!(config.candidates_per_category, 10);
        assert_eq!(config.deadline, Duration::from_secs(1500));
        assert_eq!(config.min_content_chars, 10);
    }
}
