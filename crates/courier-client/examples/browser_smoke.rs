/// Smoke-test for `BrowserFetcher` + `ScraperExtractor`.
///
/// Launches a headless Chromium, renders <https://example.com>, and checks
/// that the extractor finds the page's `<h1>` as the article title.
///
/// Run with:
///   cargo run -p courier-client --example browser_smoke --features browser
use courier_client::{BrowserFetcher, ScraperExtractor};
use courier_core::config::ArticleDefaults;
use courier_core::traits::{Extractor, Fetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("Launching headless browser…");
    let fetcher = BrowserFetcher::new().await?;
    let extractor = ScraperExtractor::new(ArticleDefaults::archive())?;

    let url = "https://example.com";
    println!("Rendering {url} …");
    let result = fetcher.fetch(url).await;
    fetcher.shutdown().await;
    let html = result?;

    let fields = extractor.extract(&html);
    assert_eq!(fields.title, "Example Domain", "unexpected title");
    assert!(
        html.len() > 500,
        "HTML suspiciously short ({} bytes)",
        html.len()
    );

    println!("OK: {} bytes rendered, title {:?}", html.len(), fields.title);
    println!("Body: {}", fields.body_text);
    Ok(())
}
