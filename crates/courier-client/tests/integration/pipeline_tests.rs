use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use url::Url;

use courier_client::{
    FeedDiscovery, LocalArchive, PublicationSink, ReqwestFetcher, RemotePublisher,
    ScraperExtractor, SitemapDiscovery, SnippetCleaner,
};
use courier_core::config::ArticleDefaults;
use courier_core::error::AppError;
use courier_core::harvest::HarvestService;
use courier_core::models::ItemStatus;
use courier_core::politeness::PolitenessConfig;
use courier_core::testutil::MockReporter;

use crate::integration::common::{LONG_BODY, article_html, sitemap_xml, spawn_site};

fn text_route(body: String) -> axum::routing::MethodRouter {
    get(move || {
        let body = body.clone();
        async move { body }
    })
}

#[tokio::test]
async fn sitemap_to_archive_skips_timeout_and_publishes_next() {
    let base = spawn_site(|base| {
        let urls = vec![
            format!("{base}/politics/slow-story"),
            format!("{base}/world/good-story/"),
            format!("{base}/tech/never-reached"),
        ];
        Router::new()
            .route("/sitemap.xml", text_route(sitemap_xml(&urls)))
            .route(
                "/politics/slow-story",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "too late"
                }),
            )
            .route(
                "/world/good-story/",
                text_route(article_html("Good story", LONG_BODY)),
            )
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let defaults = ArticleDefaults::archive();
    let fetcher = ReqwestFetcher::with_timeout(Duration::from_millis(300)).unwrap();
    let discovery = SitemapDiscovery::new(fetcher.clone(), format!("{base}/sitemap.xml"), 2);
    let service = HarvestService::new(
        fetcher,
        ScraperExtractor::new(defaults.clone()).unwrap(),
        PublicationSink::Archive(LocalArchive::new(dir.path())),
        defaults,
    )
    .with_politeness(PolitenessConfig::none());
    let reporter = MockReporter::new();

    let summary = service.run(&discovery, &reporter).await.unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.published, 1);
    assert!(matches!(summary.items[0].status, ItemStatus::Skipped { .. }));
    assert_eq!(summary.items[1].identifier, "good-story");

    let written = std::fs::read_to_string(dir.path().join("good-story.html")).unwrap();
    assert!(written.contains("<h1>Good story</h1>"));
    assert!(written.contains("Pat Doe • 2024-05-01"));
    assert!(written.contains(LONG_BODY));
    assert!(!dir.path().join("never-reached.html").exists());

    let events = reporter.events.lock().unwrap();
    assert_eq!(events.last().map(String::as_str), Some("Finished"));
}

#[tokio::test]
async fn feed_to_cms_continues_after_rejected_upload() {
    let posts = Arc::new(AtomicUsize::new(0));
    let counter = posts.clone();

    let base = spawn_site(move |base| {
        let feed = format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>Headlines</title><link>{base}</link><description>News</description>
<item><title>First</title><link>{base}/business/first/</link>
  <description>&lt;p&gt;{LONG_BODY}&lt;/p&gt;</description></item>
<item><title>Second</title><link>{base}/sports/second/</link>
  <description>{LONG_BODY}</description></item>
</channel></rss>"#
        );
        Router::new().route("/rss", text_route(feed)).route(
            "/admin/article",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::INTERNAL_SERVER_ERROR
                    } else {
                        StatusCode::OK
                    }
                }
            }),
        )
    })
    .await;

    let defaults = ArticleDefaults::cms();
    let fetcher = ReqwestFetcher::new().unwrap();
    let discovery = FeedDiscovery::new(
        fetcher.clone(),
        SnippetCleaner::new(),
        format!("{base}/rss"),
        20,
    );
    let endpoint = Url::parse(&format!("{base}/admin/article")).unwrap();
    let service = HarvestService::new(
        fetcher,
        ScraperExtractor::new(defaults.clone()).unwrap(),
        PublicationSink::Remote(RemotePublisher::new(endpoint).unwrap()),
        defaults,
    )
    .with_politeness(PolitenessConfig::none());

    let summary = service.run(&discovery, &MockReporter::new()).await.unwrap();

    assert_eq!(posts.load(Ordering::SeqCst), 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.published, 1);
    match &summary.items[1].status {
        ItemStatus::Published { destination } => assert_eq!(destination, "HTTP 200"),
        other => panic!("unexpected status: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_sitemap_is_fatal_and_writes_nothing() {
    let base = spawn_site(|_| Router::new()).await;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("archive");
    let defaults = ArticleDefaults::archive();
    let fetcher = ReqwestFetcher::new().unwrap();
    let discovery = SitemapDiscovery::new(fetcher.clone(), format!("{base}/sitemap.xml"), 5);
    let service = HarvestService::new(
        fetcher,
        ScraperExtractor::new(defaults.clone()).unwrap(),
        PublicationSink::Archive(LocalArchive::new(&root)),
        defaults,
    );
    let reporter = MockReporter::new();

    let err = service.run(&discovery, &reporter).await.unwrap_err();

    assert!(matches!(err, AppError::Discovery(_)));
    assert!(!root.exists());
    let events = reporter.events.lock().unwrap();
    assert!(events.contains(&"DiscoveryFailed".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("SessionClosed"));
}

#[tokio::test]
async fn truncated_sitemap_is_fatal_and_writes_nothing() {
    let base = spawn_site(|base| {
        let mut xml = sitemap_xml(&[format!("{base}/world/a/"), format!("{base}/world/b/")]);
        xml.truncate(xml.len() - "</urlset>".len());
        Router::new().route("/sitemap.xml", text_route(xml))
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("archive");
    let defaults = ArticleDefaults::archive();
    let fetcher = ReqwestFetcher::new().unwrap();
    let discovery = SitemapDiscovery::new(fetcher.clone(), format!("{base}/sitemap.xml"), 5);
    let service = HarvestService::new(
        fetcher,
        ScraperExtractor::new(defaults.clone()).unwrap(),
        PublicationSink::Archive(LocalArchive::new(&root)),
        defaults,
    );

    let err = service.run(&discovery, &MockReporter::new()).await.unwrap_err();

    assert!(err.to_string().contains("Malformed sitemap"));
    assert!(!root.exists());
}
