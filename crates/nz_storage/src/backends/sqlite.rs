use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nz_core::{
    ArticleId, ArticleStorage, Category, CategoryId, CategorySource, Error, NewArticle,
    NewNotification, Notification, NotificationId, NotificationStorage, Result, SaveOutcome,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use crate::StorageBackend;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        active_for_collection INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        UNIQUE (user_id, category_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news_articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_category_id INTEGER NOT NULL REFERENCES categories(id),
        category TEXT NOT NULL,
        title TEXT NOT NULL,
        original_link TEXT NOT NULL UNIQUE,
        thumbnail_url TEXT,
        summary TEXT NOT NULL,
        keywords TEXT NOT NULL,
        published_at TEXT NOT NULL,
        collected_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        message TEXT NOT NULL,
        article_id INTEGER NOT NULL REFERENCES news_articles(id),
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id, is_read)",
];

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        tracing::debug!(path = %db_path.display(), "sqlite storage ready");

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn fetch_notifications(&self, sql: &str, bind: NotificationFilter<'_>) -> Result<Vec<Notification>> {
        let query = sqlx::query(sql);
        let query = match bind {
            NotificationFilter::User(user_id) => query.bind(user_id),
            NotificationFilter::Article(article_id) => query.bind(article_id),
        };
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load notifications: {}", e)))?;

        rows.iter().map(notification_from_row).collect()
    }
}

enum NotificationFilter<'a> {
    User(&'a str),
    Article(ArticleId),
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {:?}: {}", raw, e)))
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        message: row.get("message"),
        article_id: row.get("article_id"),
        is_read: row.get::<i64, _>("is_read") != 0,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        active_for_collection: row.get::<i64, _>("active_for_collection") != 0,
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn exists_by_link(&self, link: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM news_articles WHERE original_link = ? LIMIT 1")
            .bind(link)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to check article link: {}", e)))?;
        Ok(row.is_some())
    }

    async fn save_article(&self, article: &NewArticle) -> Result<SaveOutcome> {
        let keywords = serde_json::to_string(&article.keywords)?;

        let result = sqlx::query(
            r#"
            INSERT INTO news_articles
            (source_category_id, category, title, original_link, thumbnail_url,
             summary, keywords, published_at, collected_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article.source_category_id)
        .bind(article.category.label())
        .bind(&article.title)
        .bind(&article.original_link)
        .bind(article.thumbnail_url.as_deref())
        .bind(&article.summary)
        .bind(keywords)
        .bind(article.published_at.to_rfc3339())
        .bind(article.collected_at.to_rfc3339())
        .execute(&*self.pool)
        .await;

        match result {
            Ok(done) => Ok(SaveOutcome::Inserted(done.last_insert_rowid())),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(SaveOutcome::Duplicate),
            Err(e) => Err(Error::Database(format!("Failed to store article: {}", e))),
        }
    }
}

#[async_trait]
impl NotificationStorage for SQLiteStorage {
    async fn subscribers(&self, category_id: CategoryId) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT user_id FROM subscriptions WHERE category_id = ? ORDER BY id")
            .bind(category_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load subscribers: {}", e)))?;
        Ok(rows.iter().map(|row| row.get::<String, _>("user_id")).collect())
    }

    async fn save_notification(&self, notification: &NewNotification) -> Result<NotificationId> {
        let done = sqlx::query(
            "INSERT INTO notifications (user_id, message, article_id, is_read, created_at) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&notification.user_id)
        .bind(&notification.message)
        .bind(notification.article_id)
        .bind(notification.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to store notification: {}", e)))?;
        Ok(done.last_insert_rowid())
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.fetch_notifications(
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 ORDER BY id",
            NotificationFilter::User(user_id),
        )
        .await
    }

    async fn notifications_for_article(&self, article_id: ArticleId) -> Result<Vec<Notification>> {
        self.fetch_notifications(
            "SELECT * FROM notifications WHERE article_id = ? ORDER BY id",
            NotificationFilter::Article(article_id),
        )
        .await
    }
}

#[async_trait]
impl CategorySource for SQLiteStorage {
    async fn list_active_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories WHERE active_for_collection = 1 ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load categories: {}", e)))?;
        Ok(rows.iter().map(category_from_row).collect())
    }
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn add_category(&self, name: &str) -> Result<CategoryId> {
        let name = name.trim();
        sqlx::query("INSERT OR IGNORE INTO categories (name, active_for_collection) VALUES (?, 1)")
            .bind(name)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to add category: {}", e)))?;

        let row = sqlx::query("SELECT id FROM categories WHERE name = ?")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load category: {}", e)))?;
        Ok(row.get("id"))
    }

    async fn set_category_active(&self, name: &str, active: bool) -> Result<bool> {
        let done = sqlx::query("UPDATE categories SET active_for_collection = ? WHERE name = ?")
            .bind(active as i64)
            .bind(name.trim())
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update category: {}", e)))?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to load categories: {}", e)))?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn subscribe(&self, user_id: &str, category_id: CategoryId) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO subscriptions (user_id, category_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(category_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to subscribe: {}", e)))?;
        Ok(())
    }
}
