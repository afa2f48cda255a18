use nz_core::{AnalysisModel, ArticleId, Category, Datastore, NewArticle, SaveOutcome, SearchItem};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use crate::breaker::QuotaBreaker;
use crate::fanout::notify_subscribers;
use crate::scrapers::ContentExtractor;

/// Collaborators shared by every task of one run.
pub struct TaskContext {
    pub extractor: Arc<dyn ContentExtractor>,
    pub model: Arc<dyn AnalysisModel>,
    pub store: Arc<dyn Datastore>,
    pub breaker: Arc<QuotaBreaker>,
    pub min_content_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// The breaker was already tripped when the task checked it.
    QuotaOpen,
    AlreadyCollected,
    ExtractionFailed,
    ContentTooShort,
    /// This task's own analysis call hit the rate limit.
    QuotaExceeded,
    AnalysisFailed,
    /// Another task stored the same link between our check and our insert.
    DuplicateRace,
    StorageFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipReason::QuotaOpen => "quota_open",
            SkipReason::AlreadyCollected => "already_collected",
            SkipReason::ExtractionFailed => "extraction_failed",
            SkipReason::ContentTooShort => "content_too_short",
            SkipReason::QuotaExceeded => "quota_exceeded",
            SkipReason::AnalysisFailed => "analysis_failed",
            SkipReason::DuplicateRace => "duplicate_race",
            SkipReason::StorageFailed => "storage_failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Persisted { article_id: ArticleId, notified: usize },
    Skipped(SkipReason),
}

/// Unit of work for one search candidate. Every exit is either a skip
/// without side effects or a persisted article.
pub struct EnrichmentTask {
    item: SearchItem,
    category: Category,
    ctx: Arc<TaskContext>,
}

impl EnrichmentTask {
    pub fn new(item: SearchItem, category: Category, ctx: Arc<TaskContext>) -> Self {
        Self { item, category, ctx }
    }

    #[instrument(name = "enrich", skip(self), fields(category = %self.category.name, link = %self.item.canonical_link()))]
    pub async fn run(&self) -> TaskOutcome {
        let ctx = &self.ctx;
        let link = self.item.canonical_link();

        if ctx.breaker.is_tripped() {
            debug!("quota breaker open, skipping");
            return TaskOutcome::Skipped(SkipReason::QuotaOpen);
        }

        match ctx.store.exists_by_link(link).await {
            Ok(true) => {
                debug!("already collected");
                return TaskOutcome::Skipped(SkipReason::AlreadyCollected);
            }
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "existence check failed");
                return TaskOutcome::Skipped(SkipReason::StorageFailed);
            }
        }

        let content = match ctx.extractor.extract(link).await {
            Ok(content) => content,
            Err(e) => {
                info!(error = %e, "extraction failed");
                return TaskOutcome::Skipped(SkipReason::ExtractionFailed);
            }
        };
        if let Err(e) = content.require_min_chars(ctx.min_content_chars) {
            info!(error = %e, "skipping short article");
            return TaskOutcome::Skipped(SkipReason::ContentTooShort);
        }

        // a sibling may have tripped the breaker while we were fetching
        if ctx.breaker.is_tripped() {
            debug!("quota breaker opened before analysis, skipping");
            return TaskOutcome::Skipped(SkipReason::QuotaOpen);
        }

        let enrichment = match ctx.model.analyze(&content.text).await {
            Ok(enrichment) => enrichment,
            Err(e) if e.is_quota_exceeded() => {
                if ctx.breaker.trip() {
                    warn!(model = ctx.model.name(), error = %e, "analysis quota exceeded, breaker tripped for this run");
                }
                return TaskOutcome::Skipped(SkipReason::QuotaExceeded);
            }
            Err(e) => {
                info!(error = %e, "analysis failed");
                return TaskOutcome::Skipped(SkipReason::AnalysisFailed);
            }
        };

        let article = NewArticle::from_candidate(
            &self.item,
            self.category.id,
            content.thumbnail_url,
            enrichment,
        );

        let article_id = match ctx.store.save_article(&article).await {
            Ok(SaveOutcome::Inserted(id)) => id,
            Ok(SaveOutcome::Duplicate) => {
                debug!("lost insert race, discarding");
                return TaskOutcome::Skipped(SkipReason::DuplicateRace);
            }
            Err(e) => {
                error!(error = %e, "failed to store article");
                return TaskOutcome::Skipped(SkipReason::StorageFailed);
            }
        };

        let notified = notify_subscribers(&*ctx.store, self.category.id, article_id, &article.title).await;
        info!(article_id, notified, news_category = %article.category, "article collected");

        TaskOutcome::Persisted { article_id, notified }
    }
}
