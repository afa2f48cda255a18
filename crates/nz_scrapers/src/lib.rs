pub mod breaker;
pub mod fanout;
pub mod manager;
pub mod schedule;
pub mod scrapers;
pub mod task;

pub use breaker::QuotaBreaker;
pub use manager::{Collector, CollectorConfig, RunReport};
pub use schedule::{run_periodic, ScheduleConfig};
pub use scrapers::{ContentExtractor, ExtractedContent, NewsSearch};
pub use task::{EnrichmentTask, SkipReason, TaskContext, TaskOutcome};

pub mod prelude {
    pub use super::scrapers::{ContentExtractor, ExtractedContent, NewsSearch};
    pub use super::{Collector, CollectorConfig, RunReport};
    pub use nz_core::{Error, Result, SearchItem};
}
