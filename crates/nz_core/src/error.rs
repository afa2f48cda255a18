use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    /// Page fetch failed at the transport level (connect, timeout, non-2xx).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Content too short: {len} chars (minimum {min})")]
    ContentTooShort { len: usize, min: usize },

    #[error("Inference error: {0}")]
    Inference(String),

    /// The analysis provider reported its rate limit exhausted (HTTP 429).
    #[error("Analysis quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Search provider error: {0}")]
    SearchProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// The only condition allowed to mutate shared run state.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_quota_errors_are_quota_exceeded() {
        assert!(Error::QuotaExceeded("429".into()).is_quota_exceeded());
        assert!(!Error::MalformedResponse("no candidates".into()).is_quota_exceeded());
        assert!(!Error::Inference("API error (500)".into()).is_quota_exceeded());
        assert!(!Error::Network("timeout".into()).is_quota_exceeded());
    }

    #[test]
    fn content_too_short_message() {
        let err = Error::ContentTooShort { len: 5, min: 10 };
        assert_eq!(err.to_string(), "Content too short: 5 chars (minimum 10)");
    }
}
