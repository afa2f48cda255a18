use async_trait::async_trait;
use crate::types::{ArticleId, Category, CategoryId, NewArticle, NewNotification, Notification, NotificationId, SaveOutcome};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Whether an article with this canonical link was already collected
    async fn exists_by_link(&self, link: &str) -> Result<bool>;

    /// Persist an article. Link uniqueness is enforced here, not by callers:
    /// losing a race to a concurrent writer yields `SaveOutcome::Duplicate`.
    async fn save_article(&self, article: &NewArticle) -> Result<SaveOutcome>;
}

#[async_trait]
pub trait NotificationStorage: Send + Sync {
    /// User ids subscribed to a collection category
    async fn subscribers(&self, category_id: CategoryId) -> Result<Vec<String>>;

    async fn save_notification(&self, notification: &NewNotification) -> Result<NotificationId>;

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;

    async fn notifications_for_article(&self, article_id: ArticleId) -> Result<Vec<Notification>>;
}

#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn list_active_categories(&self) -> Result<Vec<Category>>;
}

/// Everything the collector reads from and writes to.
pub trait Datastore: ArticleStorage + NotificationStorage + CategorySource {}

impl<T> Datastore for T where T: ArticleStorage + NotificationStorage + CategorySource {}
