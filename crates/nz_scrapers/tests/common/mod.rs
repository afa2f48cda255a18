#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use nz_core::{
    AnalysisModel, ArticleId, ArticleStorage, Category, CategoryId, CategorySource, Datastore,
    EnrichmentResult, Error, NewArticle, NewNotification, NewsCategory, Notification,
    NotificationId, NotificationStorage, Result, SaveOutcome, SearchItem,
};
use nz_scrapers::{Collector, CollectorConfig, ContentExtractor, ExtractedContent, NewsSearch};
use nz_storage::InMemoryStorage;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const BODY: &str = "여야가 내년도 예산안 처리에 합의했다. 본회의는 내일 오후 열린다.";

pub fn item(link: &str, title: &str) -> SearchItem {
    SearchItem {
        title: title.to_string(),
        original_link: link.to_string(),
        link: format!("https://n.news.naver.com/redirect?u={}", link),
        description: String::new(),
        published_at_raw: Some("Mon, 11 Sep 2023 11:30:00 +0900".to_string()),
    }
}

pub fn stored_article(link: &str, category_id: CategoryId) -> NewArticle {
    NewArticle {
        source_category_id: category_id,
        category: NewsCategory::Politics,
        title: "이미 수집된 기사".to_string(),
        original_link: link.to_string(),
        thumbnail_url: None,
        summary: "요약".to_string(),
        keywords: vec!["국회".to_string()],
        published_at: Utc::now(),
        collected_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct MockSearch {
    by_query: HashMap<String, Vec<SearchItem>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    pub calls: AtomicUsize,
}

impl MockSearch {
    pub fn with(mut self, query: &str, items: Vec<SearchItem>) -> Self {
        self.by_query.insert(query.to_string(), items);
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn hanging(mut self, query: &str) -> Self {
        self.hanging.insert(query.to_string());
        self
    }
}

#[async_trait]
impl NewsSearch for MockSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(query) {
            return Err(Error::SearchProvider("503 Service Unavailable".to_string()));
        }
        if self.hanging.contains(query) {
            std::future::pending::<()>().await;
        }
        Ok(self
            .by_query
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .collect())
    }
}

pub enum Page {
    Body(String),
    Fail,
    Hang,
    /// Yields to the scheduler before answering, so sibling tasks interleave.
    SlowBody(String),
}

#[derive(Default)]
pub struct MockExtractor {
    pages: HashMap<String, Page>,
}

impl MockExtractor {
    pub fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn body(self, url: &str) -> Self {
        self.page(url, Page::Body(BODY.to_string()))
    }
}

fn content(url: &str, text: &str) -> ExtractedContent {
    ExtractedContent {
        text: text.to_string(),
        thumbnail_url: Some(format!("{}/thumb.jpg", url)),
    }
}

#[async_trait]
impl ContentExtractor for MockExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        match self.pages.get(url) {
            Some(Page::Body(text)) => Ok(content(url, text)),
            Some(Page::SlowBody(text)) => {
                for _ in 0..3 {
                    tokio::task::yield_now().await;
                }
                Ok(content(url, text))
            }
            Some(Page::Hang) => std::future::pending().await,
            Some(Page::Fail) | None => Err(Error::Network(format!("{}: connection reset", url))),
        }
    }
}

#[derive(Default)]
pub struct MockModel {
    pub calls: AtomicUsize,
    quota_on_call: Option<usize>,
    malformed: bool,
    delay: Option<Duration>,
    quota_reported: AtomicBool,
    /// Calls that arrived after this model had already answered 429.
    pub calls_after_quota: AtomicUsize,
}

impl MockModel {
    pub fn quota_on_call(mut self, n: usize) -> Self {
        self.quota_on_call = Some(n);
        self
    }

    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisModel for MockModel {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn analyze(&self, text: &str) -> Result<EnrichmentResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.quota_reported.load(Ordering::SeqCst) {
            self.calls_after_quota.fetch_add(1, Ordering::SeqCst);
        }
        if self.quota_on_call == Some(n) {
            self.quota_reported.store(true, Ordering::SeqCst);
            return Err(Error::QuotaExceeded("429 RESOURCE_EXHAUSTED".to_string()));
        }
        if self.malformed {
            return Err(Error::MalformedResponse("candidate text is not valid JSON".to_string()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(EnrichmentResult {
            summary: text.chars().take(20).collect(),
            keywords: "여야,예산안,합의,국회,본회의".to_string(),
            category: NewsCategory::Politics,
        })
    }
}

/// Delegates to an in-memory store but rejects notifications for one user.
pub struct FlakyNotifications {
    pub inner: InMemoryStorage,
    pub failing_user: String,
}

#[async_trait]
impl ArticleStorage for FlakyNotifications {
    async fn exists_by_link(&self, link: &str) -> Result<bool> {
        self.inner.exists_by_link(link).await
    }

    async fn save_article(&self, article: &NewArticle) -> Result<SaveOutcome> {
        self.inner.save_article(article).await
    }
}

#[async_trait]
impl NotificationStorage for FlakyNotifications {
    async fn subscribers(&self, category_id: CategoryId) -> Result<Vec<String>> {
        self.inner.subscribers(category_id).await
    }

    async fn save_notification(&self, notification: &NewNotification) -> Result<NotificationId> {
        if notification.user_id == self.failing_user {
            return Err(Error::Database("disk I/O error".to_string()));
        }
        self.inner.save_notification(notification).await
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.inner.unread_notifications(user_id).await
    }

    async fn notifications_for_article(&self, article_id: ArticleId) -> Result<Vec<Notification>> {
        self.inner.notifications_for_article(article_id).await
    }
}

#[async_trait]
impl CategorySource for FlakyNotifications {
    async fn list_active_categories(&self) -> Result<Vec<Category>> {
        self.inner.list_active_categories().await
    }
}

pub fn collector(
    search: Arc<MockSearch>,
    extractor: MockExtractor,
    model: Arc<MockModel>,
    store: Arc<dyn Datastore>,
    config: CollectorConfig,
) -> Collector {
    Collector::new(search, Arc::new(extractor), model, store, config)
}
