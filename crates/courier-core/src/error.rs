use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for Courier.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page or a discovery document).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Navigation or request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Headless browser failed to launch, navigate or render.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Sitemap or feed discovery failed. Always fatal for the batch.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Syndication feed could not be parsed.
    #[error("Feed error: {0}")]
    FeedError(String),

    /// Article body did not reach the minimum publishable length.
    #[error("Content too short: {length} characters (minimum {minimum})")]
    ContentTooShort { length: usize, minimum: usize },

    /// Publication sink rejected the article or could not be reached.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration (endpoint URLs, selectors, limits).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true if this error must abort the whole run rather than skip
    /// a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Discovery(_) | AppError::ConfigError(_))
    }
}
