use chrono::{DateTime, Duration, Utc};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ArticleId = i64;
pub type CategoryId = i64;
pub type NotificationId = i64;

/// The closed set of labels the analysis service may assign to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NewsCategory {
    #[serde(rename = "정치")]
    Politics,
    #[serde(rename = "경제")]
    Economy,
    #[serde(rename = "사회")]
    Society,
    #[serde(rename = "생활ㆍ문화")]
    LifestyleCulture,
    #[serde(rename = "스포츠")]
    Sports,
    #[serde(rename = "엔터")]
    Entertainment,
    #[serde(rename = "ITㆍ과학")]
    ItScience,
    #[serde(rename = "세계")]
    World,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 8] = [
        NewsCategory::Politics,
        NewsCategory::Economy,
        NewsCategory::Society,
        NewsCategory::LifestyleCulture,
        NewsCategory::Sports,
        NewsCategory::Entertainment,
        NewsCategory::ItScience,
        NewsCategory::World,
    ];

    /// Label stored with the article and shown to readers.
    pub fn label(&self) -> &'static str {
        match self {
            NewsCategory::Politics => "정치",
            NewsCategory::Economy => "경제",
            NewsCategory::Society => "사회",
            NewsCategory::LifestyleCulture => "생활ㆍ문화",
            NewsCategory::Sports => "스포츠",
            NewsCategory::Entertainment => "엔터",
            NewsCategory::ItScience => "ITㆍ과학",
            NewsCategory::World => "세계",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            NewsCategory::Politics => "politics",
            NewsCategory::Economy => "economy",
            NewsCategory::Society => "society",
            NewsCategory::LifestyleCulture => "lifestyle-culture",
            NewsCategory::Sports => "sports",
            NewsCategory::Entertainment => "entertainment",
            NewsCategory::ItScience => "it-science",
            NewsCategory::World => "world",
        }
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NewsCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        NewsCategory::ALL
            .into_iter()
            .find(|c| c.label() == s || c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category label: {:?}", s))
    }
}

/// A collection category, owned by the category administration side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub active_for_collection: bool,
}

/// One candidate returned by the news search provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    pub original_link: String,
    pub link: String,
    pub description: String,
    pub published_at_raw: Option<String>,
}

impl SearchItem {
    pub fn clean_title(&self) -> String {
        strip_markup(&self.title)
    }

    /// The uniqueness key. Falls back to the provider link when the
    /// original link is missing.
    pub fn canonical_link(&self) -> &str {
        if self.original_link.trim().is_empty() {
            self.link.trim()
        } else {
            self.original_link.trim()
        }
    }

    pub fn published_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        parse_published_at(self.published_at_raw.as_deref(), now)
    }
}

/// Removes inline tags and decodes entities, e.g. `<b>Seoul</b> &quot;x&quot;`.
pub fn strip_markup(fragment: &str) -> String {
    if fragment.is_empty() {
        return String::new();
    }
    let parsed = Html::parse_fragment(fragment);
    parsed.root_element().text().collect::<String>().trim().to_string()
}

/// Parses the provider's RFC 2822 date (`Mon, 11 Sep 2023 11:30:00 +0900`).
/// Missing dates become a day old; unparseable ones two hours old.
pub fn parse_published_at(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => now - Duration::days(1),
        Some(raw) => match DateTime::parse_from_rfc2822(raw) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                tracing::debug!(raw, error = %e, "unparseable pubDate, using fallback");
                now - Duration::hours(2)
            }
        },
    }
}

/// Structured output of the analysis service. Transient; mapped into an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub summary: String,
    pub keywords: String,
    pub category: NewsCategory,
}

impl EnrichmentResult {
    pub fn keyword_list(&self) -> Vec<String> {
        split_keywords(&self.keywords)
    }
}

pub fn split_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// An enriched article that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub source_category_id: CategoryId,
    pub category: NewsCategory,
    pub title: String,
    pub original_link: String,
    pub thumbnail_url: Option<String>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
}

impl NewArticle {
    /// Builds the row for a candidate; `collected_at` is stamped here.
    pub fn from_candidate(
        item: &SearchItem,
        source_category_id: CategoryId,
        thumbnail_url: Option<String>,
        enrichment: EnrichmentResult,
    ) -> Self {
        let now = Utc::now();
        Self {
            source_category_id,
            category: enrichment.category,
            title: item.clean_title(),
            original_link: item.canonical_link().to_string(),
            thumbnail_url,
            keywords: enrichment.keyword_list(),
            summary: enrichment.summary,
            published_at: item.published_at(now),
            collected_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub source_category_id: CategoryId,
    pub category: NewsCategory,
    pub title: String,
    pub original_link: String,
    pub thumbnail_url: Option<String>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
}

impl Article {
    pub fn from_new(id: ArticleId, article: NewArticle) -> Self {
        Self {
            id,
            source_category_id: article.source_category_id,
            category: article.category,
            title: article.title,
            original_link: article.original_link,
            thumbnail_url: article.thumbnail_url,
            summary: article.summary,
            keywords: article.keywords,
            published_at: article.published_at,
            collected_at: article.collected_at,
        }
    }
}

/// Result of an article insert. A duplicate is the storage layer
/// rejecting a link that a concurrent writer persisted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(ArticleId),
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub message: String,
    pub article_id: ArticleId,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>, article_id: ArticleId) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            article_id,
            created_at: Utc::now(),
        }
    }

    pub fn new_article(user_id: impl Into<String>, title: &str, article_id: ArticleId) -> Self {
        Self::new(user_id, format!("새 기사: {}", title), article_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: String,
    pub message: String,
    pub article_id: ArticleId,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_new(id: NotificationId, notification: NewNotification) -> Self {
        Self {
            id,
            user_id: notification.user_id,
            message: notification.message,
            article_id: notification.article_id,
            is_read: false,
            created_at: notification.created_at,
        }
    }
}
