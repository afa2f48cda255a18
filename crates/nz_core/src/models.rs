use async_trait::async_trait;
use crate::types::EnrichmentResult;
use crate::Result;

#[async_trait]
pub trait AnalysisModel: Send + Sync {
    fn name(&self) -> &str;

    /// Derive summary, keywords and category from article text.
    ///
    /// A provider rate limit must surface as `Error::QuotaExceeded`; every
    /// other failure is a soft error the caller absorbs.
    async fn analyze(&self, text: &str) -> Result<EnrichmentResult>;
}
