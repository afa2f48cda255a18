use async_trait::async_trait;
use nz_core::{Category, CategoryId, Datastore, Error, Result};
use std::path::Path;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

/// Administration operations a concrete backend offers on top of what the
/// collection pipeline consumes.
#[async_trait]
pub trait StorageBackend: Datastore {
    fn backend_name(&self) -> &'static str;

    /// Registers a collection category, returning the existing id when the
    /// name is already known.
    async fn add_category(&self, name: &str) -> Result<CategoryId>;

    /// Returns false when no category carries that name.
    async fn set_category_active(&self, name: &str, active: bool) -> Result<bool>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn subscribe(&self, user_id: &str, category_id: CategoryId) -> Result<()>;
}

/// A backend opened by name, usable both as the pipeline's datastore and for
/// administration.
#[derive(Clone)]
pub enum Storage {
    Memory(Arc<InMemoryStorage>),
    #[cfg(feature = "sqlite")]
    Sqlite(Arc<SQLiteStorage>),
}

impl Storage {
    pub fn datastore(&self) -> Arc<dyn Datastore> {
        match self {
            Storage::Memory(s) => s.clone(),
            #[cfg(feature = "sqlite")]
            Storage::Sqlite(s) => s.clone(),
        }
    }

    pub fn admin(&self) -> Arc<dyn StorageBackend> {
        match self {
            Storage::Memory(s) => s.clone(),
            #[cfg(feature = "sqlite")]
            Storage::Sqlite(s) => s.clone(),
        }
    }
}

pub fn get_available_backends() -> Vec<&'static str> {
    let mut backends = vec!["memory"];
    if cfg!(feature = "sqlite") {
        backends.push("sqlite");
    }
    backends
}

/// Opens the named backend. `database` is only read by file-backed stores.
pub async fn create_storage(kind: &str, database: &Path) -> Result<Storage> {
    match kind.to_lowercase().as_str() {
        "memory" => Ok(Storage::Memory(Arc::new(InMemoryStorage::new()))),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Storage::Sqlite(Arc::new(
            SQLiteStorage::new_with_path(database).await?,
        ))),
        other => {
            let _ = database;
            Err(Error::Config(format!(
                "Unknown storage backend: {} (available: {})",
                other,
                get_available_backends().join(", ")
            )))
        }
    }
}
