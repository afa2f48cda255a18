use async_trait::async_trait;
use nz_core::{Error, Result, SearchItem};

pub mod article;
pub mod naver;

pub use article::{ExtractorConfig, HtmlExtractor};
pub use naver::{NaverSearch, SearchConfig};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

/// Sent to the search API, which is called as a client rather than a browser.
pub const CLIENT_USER_AGENT: &str = concat!("nuzip/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Returns the newest items for `query`, at most `limit` of them.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchItem>>;
}

/// Cleaned body text of one page plus its preview image, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub thumbnail_url: Option<String>,
}

impl ExtractedContent {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Fails with `Error::ContentTooShort` when the text is under `min` chars.
    pub fn require_min_chars(&self, min: usize) -> Result<()> {
        let len = self.char_len();
        if len < min {
            return Err(Error::ContentTooShort { len, min });
        }
        Ok(())
    }
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Length is not checked here; callers apply their own minimum.
    async fn extract(&self, url: &str) -> Result<ExtractedContent>;
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use nz_core::{Error, Result};
    use scraper::Selector;
    use url::Url;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {:?}: {}", css, e)))
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Resolves `reference` against `base`; unresolvable references are kept as-is.
    pub fn resolve_url(base: Option<&Url>, reference: &str) -> String {
        match base.and_then(|b| b.join(reference).ok()) {
            Some(resolved) => resolved.to_string(),
            None => reference.to_string(),
        }
    }
}
