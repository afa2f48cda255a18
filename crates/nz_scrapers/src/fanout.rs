use nz_core::{ArticleId, CategoryId, NewNotification, NotificationStorage};
use tracing::{debug, error};

/// Creates one notification per subscriber of `category_id` and returns how
/// many were stored. Failures are logged per subscriber and never undo the
/// article.
pub async fn notify_subscribers<S>(
    store: &S,
    category_id: CategoryId,
    article_id: ArticleId,
    title: &str,
) -> usize
where
    S: NotificationStorage + ?Sized,
{
    let subscribers = match store.subscribers(category_id).await {
        Ok(subscribers) => subscribers,
        Err(e) => {
            error!(category_id, article_id, error = %e, "failed to load subscribers");
            return 0;
        }
    };

    let mut created = 0;
    for user_id in &subscribers {
        let notification = NewNotification::new_article(user_id.as_str(), title, article_id);
        match store.save_notification(&notification).await {
            Ok(_) => created += 1,
            Err(e) => error!(user_id = %user_id, article_id, error = %e, "failed to store notification"),
        }
    }

    debug!(article_id, created, subscribers = subscribers.len(), "fanout complete");
    created
}
