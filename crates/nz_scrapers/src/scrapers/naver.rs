use async_trait::async_trait;
use nz_core::{Error, Result, SearchItem};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;
use super::{NewsSearch, CLIENT_USER_AGENT};

pub const DEFAULT_BASE_URL: &str = "https://openapi.naver.com";
const MAX_DISPLAY: usize = 100;

#[derive(Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl SearchConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(10),
            user_agent: CLIENT_USER_AGENT.to_string(),
        }
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    items: Vec<NewsItem>,
}

#[derive(Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    originallink: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

impl From<NewsItem> for SearchItem {
    fn from(item: NewsItem) -> Self {
        SearchItem {
            title: item.title,
            original_link: item.originallink,
            link: item.link,
            description: item.description,
            published_at_raw: item.pub_date,
        }
    }
}

/// Naver news search, newest first.
pub struct NaverSearch {
    client: Client,
    config: SearchConfig,
}

impl NaverSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(Error::Config("Naver client id and secret are required".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

pub fn build_search_url(base_url: &str, query: &str, limit: usize) -> Result<Url> {
    let display = limit.clamp(1, MAX_DISPLAY).to_string();
    let endpoint = format!("{}/v1/search/news.json", base_url.trim_end_matches('/'));
    Url::parse_with_params(
        &endpoint,
        &[("query", query), ("display", display.as_str()), ("sort", "date")],
    )
    .map_err(|e| Error::InvalidUrl(format!("{}: {}", endpoint, e)))
}

/// Items with no usable link are dropped; everything else is passed through raw.
pub fn parse_search_response(body: &str) -> Result<Vec<SearchItem>> {
    let response: NewsResponse = serde_json::from_str(body)
        .map_err(|e| Error::SearchProvider(format!("Undecodable search response: {}", e)))?;
    Ok(response
        .items
        .into_iter()
        .map(SearchItem::from)
        .filter(|item| !item.canonical_link().is_empty())
        .collect())
}

#[async_trait]
impl NewsSearch for NaverSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchItem>> {
        let url = build_search_url(&self.config.base_url, query, limit)?;

        let response = self
            .client
            .get(url)
            .header("X-Naver-Client-Id", &self.config.client_id)
            .header("X-Naver-Client-Secret", &self.config.client_secret)
            .send()
            .await
            .map_err(|e| Error::SearchProvider(format!("Search request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::SearchProvider(format!("Failed to read search response: {}", e)))?;
        if !status.is_success() {
            return Err(Error::SearchProvider(format!("Search returned {}: {}", status, body)));
        }

        let mut items = parse_search_response(&body)?;
        items.truncate(limit);
        tracing::debug!(query, count = items.len(), "search complete");
        Ok(items)
    }
}
