use std::future::Future;

use crate::error::AppError;
use crate::models::{ExtractionResult, NormalizedArticle, SourceReference};

/// Fetches the (rendered) document text of a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Release any session held by the fetcher. Called exactly once, when
    /// the batch ends.
    fn shutdown(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Converts raw HTML fragments into readable plain text.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// Pulls structured article fields out of a document.
///
/// Extraction never fails: a field no strategy could find is left empty
/// (or set to its fallback literal).
pub trait Extractor: Send + Sync + Clone {
    fn extract(&self, html: &str) -> ExtractionResult;
}

/// Resolves the ordered, bounded list of articles to process.
pub trait Discovery: Send + Sync {
    fn discover(&self) -> impl Future<Output = Result<Vec<SourceReference>, AppError>> + Send;
}

/// Delivers a finished article to its destination.
pub trait Publisher: Send + Sync {
    /// Returns a destination identifier (file path or accepted-response
    /// marker). Implementations must not retry internally.
    fn publish(
        &self,
        article: &NormalizedArticle,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}
