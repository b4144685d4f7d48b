#[cfg(feature = "browser")]
pub mod browser_fetcher;
pub mod cleaner;
pub mod extractor;
pub mod feed;
pub mod fetcher;
pub mod publisher;
pub mod sitemap;

#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
pub use cleaner::SnippetCleaner;
pub use extractor::{ExtractionRules, ScraperExtractor, Strategy, ValueSource};
pub use feed::FeedDiscovery;
pub use fetcher::{DEFAULT_TIMEOUT, DESKTOP_USER_AGENT, ReqwestFetcher};
pub use publisher::{LocalArchive, PublicationSink, RemotePublisher};
pub use sitemap::SitemapDiscovery;
