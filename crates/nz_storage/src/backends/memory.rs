use async_trait::async_trait;
use nz_core::{
    Article, ArticleId, ArticleStorage, Category, CategoryId, CategorySource, NewArticle,
    NewNotification, Notification, NotificationId, NotificationStorage, Result, SaveOutcome,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::StorageBackend;

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    links: HashSet<String>,
    categories: Vec<Category>,
    subscriptions: Vec<(String, CategoryId)>,
    notifications: Vec<Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and insert happen under the same `&mut self`, which is what
    /// makes link uniqueness hold for concurrent writers.
    pub fn store_article(&mut self, article: &NewArticle) -> SaveOutcome {
        if !self.links.insert(article.original_link.clone()) {
            return SaveOutcome::Duplicate;
        }
        let id = self.articles.len() as ArticleId + 1;
        self.articles.push(Article::from_new(id, article.clone()));
        SaveOutcome::Inserted(id)
    }

    pub fn store_notification(&mut self, notification: &NewNotification) -> NotificationId {
        let id = self.notifications.len() as NotificationId + 1;
        self.notifications
            .push(Notification::from_new(id, notification.clone()));
        id
    }

    pub fn add_category(&mut self, name: &str) -> CategoryId {
        if let Some(existing) = self.categories.iter().find(|c| c.name == name) {
            return existing.id;
        }
        let id = self.categories.len() as CategoryId + 1;
        self.categories.push(Category {
            id,
            name: name.to_string(),
            active_for_collection: true,
        });
        id
    }
}

/// Process-local datastore, used for dry runs and tests.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn articles(&self) -> Vec<Article> {
        self.store.read().await.articles.clone()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.store.read().await.notifications.clone()
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn exists_by_link(&self, link: &str) -> Result<bool> {
        Ok(self.store.read().await.links.contains(link))
    }

    async fn save_article(&self, article: &NewArticle) -> Result<SaveOutcome> {
        let mut store = self.store.write().await;
        Ok(store.store_article(article))
    }
}

#[async_trait]
impl NotificationStorage for InMemoryStorage {
    async fn subscribers(&self, category_id: CategoryId) -> Result<Vec<String>> {
        let store = self.store.read().await;
        Ok(store
            .subscriptions
            .iter()
            .filter(|(_, id)| *id == category_id)
            .map(|(user, _)| user.clone())
            .collect())
    }

    async fn save_notification(&self, notification: &NewNotification) -> Result<NotificationId> {
        let mut store = self.store.write().await;
        Ok(store.store_notification(notification))
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let store = self.store.read().await;
        Ok(store
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .cloned()
            .collect())
    }

    async fn notifications_for_article(&self, article_id: ArticleId) -> Result<Vec<Notification>> {
        let store = self.store.read().await;
        Ok(store
            .notifications
            .iter()
            .filter(|n| n.article_id == article_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategorySource for InMemoryStorage {
    async fn list_active_categories(&self) -> Result<Vec<Category>> {
        let store = self.store.read().await;
        Ok(store
            .categories
            .iter()
            .filter(|c| c.active_for_collection)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn add_category(&self, name: &str) -> Result<CategoryId> {
        Ok(self.store.write().await.add_category(name.trim()))
    }

    async fn set_category_active(&self, name: &str, active: bool) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.categories.iter_mut().find(|c| c.name == name.trim()) {
            Some(category) => {
                category.active_for_collection = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.read().await.categories.clone())
    }

    async fn subscribe(&self, user_id: &str, category_id: CategoryId) -> Result<()> {
        let mut store = self.store.write().await;
        let entry = (user_id.to_string(), category_id);
        if !store.subscriptions.contains(&entry) {
            store.subscriptions.push(entry);
        }
        Ok(())
    }
}
