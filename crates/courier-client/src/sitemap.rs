use std::collections::HashSet;
use std::sync::LazyLock;

use courier_core::error::AppError;
use courier_core::models::SourceReference;
use courier_core::traits::{Discovery, Fetcher};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

static LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").expect("valid regex"));

/// Discovers article URLs from the `<loc>` entries of an XML sitemap.
///
/// Document order is preserved, duplicate URLs keep their first position,
/// and the list is capped at `max_items`.
#[derive(Clone)]
pub struct SitemapDiscovery<F> {
    fetcher: F,
    url: String,
    max_items: usize,
}

impl<F: Fetcher> SitemapDiscovery<F> {
    pub fn new(fetcher: F, url: impl Into<String>, max_items: usize) -> Self {
        Self {
            fetcher,
            url: url.into(),
            max_items,
        }
    }
}

/// Extract `<loc>` values from a sitemap document.
///
/// The document must be well-formed XML with every element closed; a
/// truncated sitemap would otherwise silently drop entries.
pub fn parse_locations(xml: &str) -> Result<Vec<String>, AppError> {
    check_well_formed(xml)?;

    Ok(LOC_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_loc(m.as_str()))
        .filter(|loc| !loc.is_empty())
        .collect())
}

fn check_well_formed(xml: &str) -> Result<(), AppError> {
    let malformed = |detail: String| AppError::Discovery(format!("Malformed sitemap: {detail}"));

    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                saw_root = true;
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(format!(
                    "{e} at byte {}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if !saw_root {
        return Err(malformed("no root element".to_string()));
    }
    if depth != 0 {
        return Err(malformed(format!(
            "document ends with {depth} unclosed element(s)"
        )));
    }
    Ok(())
}

/// Unwrap CDATA sections and decode XML entities such as `&amp;`.
fn decode_loc(raw: &str) -> String {
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw);
    html_escape::decode_html_entities(raw.trim()).into_owned()
}

impl<F: Fetcher> Discovery for SitemapDiscovery<F> {
    async fn discover(&self) -> Result<Vec<SourceReference>, AppError> {
        let xml = self
            .fetcher
            .fetch(&self.url)
            .await
            .map_err(|e| AppError::Discovery(format!("Failed to fetch sitemap {}: {e}", self.url)))?;

        let locations = parse_locations(&xml)?;
        let total = locations.len();

        let mut seen = HashSet::new();
        let sources: Vec<SourceReference> = locations
            .into_iter()
            .filter(|loc| seen.insert(loc.clone()))
            .take(self.max_items)
            .enumerate()
            .map(|(i, url)| SourceReference::sitemap(url, i + 1))
            .collect();

        tracing::debug!(
            sitemap = %self.url,
            found = total,
            kept = sources.len(),
            "Parsed sitemap"
        );
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::models::DiscoveryOrigin;
    use courier_core::testutil::MockFetcher;

    fn sitemap(locs: &[&str]) -> String {
        let entries: String = locs
            .iter()
            .map(|l| format!("  <url>\n    <loc>{l}</loc>\n  </url>\n"))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</urlset>"
        )
    }

    #[tokio::test]
    async fn test_keeps_document_order_and_caps() {
        let xml = sitemap(&[
            "https://news.example.com/politics/a",
            "https://news.example.com/world/b",
            "https://news.example.com/tech/c",
        ]);
        let discovery = SitemapDiscovery::new(MockFetcher::new(&xml), "https://x/sitemap.xml", 2);

        let sources = discovery.discover().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://news.example.com/politics/a");
        assert_eq!(sources[0].position, 1);
        assert_eq!(sources[1].url, "https://news.example.com/world/b");
        assert_eq!(sources[1].position, 2);
        assert!(sources.iter().all(|s| matches!(s.origin, DiscoveryOrigin::Sitemap)));
    }

    #[tokio::test]
    async fn test_duplicates_keep_first_position() {
        let xml = sitemap(&["https://x/a", "https://x/b", "https://x/a", "https://x/c"]);
        let discovery = SitemapDiscovery::new(MockFetcher::new(&xml), "https://x/sitemap.xml", 10);

        let urls: Vec<String> = discovery
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.url)
            .collect();
        assert_eq!(urls, vec!["https://x/a", "https://x/b", "https://x/c"]);
    }

    #[tokio::test]
    async fn test_zero_locs_is_empty_not_error() {
        let discovery =
            SitemapDiscovery::new(MockFetcher::new(&sitemap(&[])), "https://x/sitemap.xml", 5);
        assert!(discovery.discover().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_discovery_error() {
        let discovery = SitemapDiscovery::new(
            MockFetcher::with_error(AppError::HttpError("HTTP 503 for https://x".into())),
            "https://x/sitemap.xml",
            5,
        );
        let err = discovery.discover().await.unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unbalanced_tags_are_malformed() {
        let err = parse_locations("<urlset><url><loc>https://x/a</url></urlset>").unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
    }

    #[test]
    fn test_truncated_between_entries_is_malformed() {
        let xml = "<?xml version=\"1.0\"?><urlset><url><loc>https://x/a</loc></url><url><loc>https://x/b</loc></url><ur";
        let err = parse_locations(xml).unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
        assert!(err.to_string().contains("Malformed sitemap"));
    }

    #[test]
    fn test_missing_root_close_is_malformed() {
        let xml = "<urlset><url><loc>https://x/a</loc></url>";
        let err = parse_locations(xml).unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        assert!(matches!(parse_locations(""), Err(AppError::Discovery(_))));
    }

    #[tokio::test]
    async fn test_truncated_download_fails_discovery() {
        let mut xml = sitemap(&["https://x/a", "https://x/b"]);
        xml.truncate(xml.len() - "</urlset>".len());
        let discovery = SitemapDiscovery::new(MockFetcher::new(&xml), "https://x/sitemap.xml", 5);
        let err = discovery.discover().await.unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_decodes_entities_and_cdata() {
        let locs = parse_locations(
            "<urlset><loc>https://x/a?x=1&amp;y=2</loc><loc><![CDATA[https://x/b]]></loc></urlset>",
        )
        .unwrap();
        assert_eq!(locs, vec!["https://x/a?x=1&y=2", "https://x/b"]);
    }

    #[test]
    fn test_whitespace_inside_loc_is_trimmed() {
        let locs = parse_locations("<loc>\n   https://x/a \n</loc>").unwrap();
        assert_eq!(locs, vec!["https://x/a"]);
    }
}
