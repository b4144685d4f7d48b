//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::harvest::{HarvestEvent, HarvestReporter};
use crate::models::{ExtractionResult, NormalizedArticle, SourceReference};
use crate::traits::{Discovery, Extractor, Fetcher, Publisher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that replays a queue of responses and records requests.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
    pub shutdowns: Arc<Mutex<usize>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(Mutex::new(0)),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }

    async fn shutdown(&self) {
        *self.shutdowns.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor reading `<h1>` as title and the first `<p>` as body.
#[derive(Clone)]
pub struct MockExtractor;

impl MockExtractor {
    pub fn body_from_paragraph() -> Self {
        Self
    }
}

fn between<'a>(html: &'a str, open: &str, close: &str) -> &'a str {
    html.find(open)
        .map(|start| &html[start + open.len()..])
        .and_then(|rest| rest.find(close).map(|end| &rest[..end]))
        .unwrap_or_default()
}

impl Extractor for MockExtractor {
    fn extract(&self, html: &str) -> ExtractionResult {
        ExtractionResult {
            title: between(html, "<h1>", "</h1>").to_string(),
            body_text: between(html, "<p>", "</p>").to_string(),
            ..ExtractionResult::default()
        }
    }
}

// ---------------------------------------------------------------------------
// MockPublisher
// ---------------------------------------------------------------------------

/// Mock publisher that records every article it receives.
#[derive(Clone)]
pub struct MockPublisher {
    pub published: Arc<Mutex<Vec<NormalizedArticle>>>,
    /// Queue of results. If empty, accepts with `mock://<identifier>`.
    results: Arc<Mutex<Vec<Result<String, AppError>>>>,
}

impl MockPublisher {
    pub fn accepting() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn with_results(results: Vec<Result<String, AppError>>) -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            results: Arc::new(Mutex::new(results)),
        }
    }
}

impl Publisher for MockPublisher {
    async fn publish(&self, article: &NormalizedArticle) -> Result<String, AppError> {
        self.published.lock().unwrap().push(article.clone());
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Ok(format!("mock://{}", article.identifier))
        } else {
            results.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockDiscovery
// ---------------------------------------------------------------------------

/// Mock discovery returning a fixed list (or error) once.
pub struct MockDiscovery {
    result: Mutex<Option<Result<Vec<SourceReference>, AppError>>>,
}

impl MockDiscovery {
    pub fn with_sources(sources: Vec<SourceReference>) -> Self {
        Self {
            result: Mutex::new(Some(Ok(sources))),
        }
    }

    /// Sitemap references for the given URLs, positions starting at 1.
    pub fn sitemap(urls: &[&str]) -> Self {
        Self::with_sources(
            urls.iter()
                .enumerate()
                .map(|(i, url)| SourceReference::sitemap(*url, i + 1))
                .collect(),
        )
    }

    pub fn failing(error: AppError) -> Self {
        Self {
            result: Mutex::new(Some(Err(error))),
        }
    }
}

impl Discovery for MockDiscovery {
    async fn discover(&self) -> Result<Vec<SourceReference>, AppError> {
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock harvest reporter that records event names.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HarvestReporter for MockReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        let label = match &event {
            HarvestEvent::DiscoveryStarted => "DiscoveryStarted",
            HarvestEvent::Discovered { .. } => "Discovered",
            HarvestEvent::DiscoveryFailed { .. } => "DiscoveryFailed",
            HarvestEvent::ItemStarted { .. } => "ItemStarted",
            HarvestEvent::ItemFinished { .. } => "ItemFinished",
            HarvestEvent::SessionClosed => "SessionClosed",
            HarvestEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
