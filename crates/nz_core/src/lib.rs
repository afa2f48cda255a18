pub mod models;
pub mod error;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::AnalysisModel;
pub use storage::{ArticleStorage, CategorySource, Datastore, NotificationStorage};
pub use types::*;
