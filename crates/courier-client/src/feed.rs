use chrono::DateTime;
use courier_core::error::AppError;
use courier_core::models::{ExtractionResult, SourceReference};
use courier_core::normalize::date_prefix;
use courier_core::traits::{Cleaner, Discovery, Fetcher};
use rss::{Channel, Item};

/// Discovers articles from an RSS 2.0 feed.
///
/// Feed items carry their own title, summary, author and date, so every
/// [`SourceReference`] produced here is self-contained and the orchestrator
/// skips the page fetch.
#[derive(Clone)]
pub struct FeedDiscovery<F, C> {
    fetcher: F,
    cleaner: C,
    url: String,
    max_items: usize,
}

impl<F: Fetcher, C: Cleaner> FeedDiscovery<F, C> {
    pub fn new(fetcher: F, cleaner: C, url: impl Into<String>, max_items: usize) -> Self {
        Self {
            fetcher,
            cleaner,
            url: url.into(),
            max_items,
        }
    }

    fn fields_for(&self, item: &Item) -> ExtractionResult {
        let summary_html = item
            .description()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| item.content())
            .unwrap_or_default();
        let body_text = match self.cleaner.clean(summary_html) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Using raw feed summary");
                summary_html.trim().to_string()
            }
        };

        let author = item
            .dublin_core_ext()
            .and_then(|dc| dc.creators().first())
            .map(String::as_str)
            .or_else(|| item.author())
            .unwrap_or_default()
            .trim()
            .to_string();

        ExtractionResult {
            title: item.title().unwrap_or_default().trim().to_string(),
            author,
            published_date: item.pub_date().map(feed_date).unwrap_or_default(),
            body_text,
            image_url: item
                .enclosure()
                .map(|e| e.url().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Reduce an RSS date (RFC 2822, or RFC 3339 as some feeds emit) to
/// `YYYY-MM-DD` in the publisher's own offset.
pub fn feed_date(raw: &str) -> String {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| date_prefix(raw))
}

impl<F: Fetcher, C: Cleaner> Discovery for FeedDiscovery<F, C> {
    async fn discover(&self) -> Result<Vec<SourceReference>, AppError> {
        let xml = self
            .fetcher
            .fetch(&self.url)
            .await
            .map_err(|e| AppError::Discovery(format!("Failed to fetch feed {}: {e}", self.url)))?;

        let channel = Channel::read_from(xml.as_bytes())
            .map_err(|e| AppError::Discovery(format!("Failed to parse feed {}: {e}", self.url)))?;

        let mut seen = std::collections::HashSet::new();
        let sources: Vec<SourceReference> = channel
            .items()
            .iter()
            .filter_map(|item| {
                let link = item.link()?.trim();
                (!link.is_empty() && seen.insert(link.to_string())).then_some((link, item))
            })
            .take(self.max_items)
            .enumerate()
            .map(|(i, (link, item))| SourceReference::feed(link, i + 1, self.fields_for(item)))
            .collect();

        tracing::debug!(
            feed = %self.url,
            channel = channel.title(),
            found = channel.items().len(),
            kept = sources.len(),
            "Parsed feed"
        );
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::models::DiscoveryOrigin;
    use courier_core::testutil::MockFetcher;

    use crate::cleaner::SnippetCleaner;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Headlines</title>
  <link>https://news.example.com</link>
  <description>Top stories</description>
  <item>
    <title>Budget deal reached</title>
    <link>https://news.example.com/news/2024/mar/5/budget-deal/</link>
    <description><![CDATA[<p>Negotiators reached a <b>budget</b> deal late on Tuesday night.</p>]]></description>
    <dc:creator>Jane Roe</dc:creator>
    <pubDate>Tue, 05 Mar 2024 23:30:00 -0500</pubDate>
    <enclosure url="https://cdn.example.com/budget.jpg" length="0" type="image/jpeg"/>
  </item>
  <item>
    <title>No link here</title>
    <description>Dropped.</description>
  </item>
  <item>
    <title>Storm heads east</title>
    <link>https://news.example.com/world/storm/</link>
    <content:encoded><![CDATA[<p>The storm is expected to make landfall on Friday.</p>]]></content:encoded>
    <author>desk@example.com (Weather Desk)</author>
    <pubDate>2024-03-06T08:00:00Z</pubDate>
  </item>
  <item>
    <title>Third</title>
    <link>https://news.example.com/tech/third/</link>
  </item>
</channel>
</rss>"#;

    fn discovery(xml: &str, max: usize) -> FeedDiscovery<MockFetcher, SnippetCleaner> {
        FeedDiscovery::new(
            MockFetcher::new(xml),
            SnippetCleaner::new(),
            "https://news.example.com/rss",
            max,
        )
    }

    fn fields(source: &SourceReference) -> &ExtractionResult {
        match &source.origin {
            DiscoveryOrigin::Feed { fields } => fields,
            DiscoveryOrigin::Sitemap => panic!("expected a feed item"),
        }
    }

    #[tokio::test]
    async fn test_items_carry_fields() {
        let sources = discovery(FEED, 10).discover().await.unwrap();
        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|s| matches!(s.origin, DiscoveryOrigin::Feed { .. })));

        let first = fields(&sources[0]);
        assert_eq!(sources[0].position, 1);
        assert_eq!(first.title, "Budget deal reached");
        assert_eq!(first.author, "Jane Roe");
        assert_eq!(first.published_date, "2024-03-05");
        assert_eq!(first.image_url, "https://cdn.example.com/budget.jpg");
        assert!(first.body_text.contains("Negotiators reached a"));
        assert!(!first.body_text.contains("<p>"));
    }

    #[tokio::test]
    async fn test_content_and_author_fallbacks() {
        let sources = discovery(FEED, 10).discover().await.unwrap();
        let storm = fields(&sources[1]);
        assert_eq!(sources[1].url, "https://news.example.com/world/storm/");
        assert_eq!(sources[1].position, 2);
        assert_eq!(storm.author, "desk@example.com (Weather Desk)");
        assert_eq!(storm.published_date, "2024-03-06");
        assert!(storm.body_text.contains("make landfall"));
        assert_eq!(storm.image_url, "");
    }

    #[tokio::test]
    async fn test_takes_first_n_with_link() {
        let sources = discovery(FEED, 2).discover().await.unwrap();
        let urls: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://news.example.com/news/2024/mar/5/budget-deal/",
                "https://news.example.com/world/storm/",
            ]
        );
    }

    #[tokio::test]
    async fn test_unparsable_feed_is_discovery_error() {
        let err = discovery("<html>not a feed</html>", 5)
            .discover()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
    }

    #[test]
    fn test_feed_date_formats() {
        assert_eq!(feed_date("Tue, 05 Mar 2024 23:30:00 -0500"), "2024-03-05");
        assert_eq!(feed_date("2024-03-06T08:00:00+01:00"), "2024-03-06");
        assert_eq!(feed_date("2024-03-07 12:00"), "2024-03-07");
        assert_eq!(feed_date("yesterday"), "");
    }
}
