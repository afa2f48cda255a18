use std::sync::Arc;
use nz_core::{AnalysisModel, Error, Result};
use crate::Config;

pub mod dummy;
pub mod gemini;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;

pub fn get_available_models() -> Vec<&'static str> {
    vec!["gemini", "dummy"]
}

pub fn create_model(name: &str, config: Config) -> Result<Arc<dyn AnalysisModel>> {
    match name.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Config(format!(
            "Unknown model: {} (available: {})",
            other,
            get_available_models().join(", ")
        ))),
    }
}
