use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use courier_client::{
    ExtractionRules, FeedDiscovery, LocalArchive, PublicationSink, RemotePublisher,
    ReqwestFetcher, ScraperExtractor, SitemapDiscovery, SnippetCleaner,
};
use courier_core::config::{ArticleDefaults, validate_endpoint};
use courier_core::harvest::{HarvestService, TracingHarvestReporter};
use courier_core::models::HarvestSummary;
use courier_core::politeness::PolitenessConfig;
use courier_core::traits::{Discovery, Extractor, Fetcher};

const DEFAULT_ARCHIVE_MAX_ITEMS: usize = 50;
const DEFAULT_CMS_MAX_ITEMS: usize = 20;

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Harvest news articles into an offline archive or a CMS"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover articles from a sitemap or feed and publish each one
    Harvest(HarvestArgs),

    /// Fetch a single page and print the extracted fields as JSON
    Extract {
        /// Page URL
        #[arg(short, long)]
        url: String,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Extra article-body container selector (repeatable)
        #[arg(long = "body-selector")]
        body_selectors: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Renderer {
    /// Headless Chromium; runs page scripts before extraction
    Browser,
    /// Plain HTTP GET
    Http,
}

impl Default for Renderer {
    fn default() -> Self {
        if cfg!(feature = "browser") {
            Renderer::Browser
        } else {
            Renderer::Http
        }
    }
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// How article pages are retrieved
    #[arg(long, value_enum, default_value_t = Renderer::default())]
    renderer: Renderer,

    /// Per-page timeout (navigation plus network quiescence), in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Pause after each browser navigation, in milliseconds
    #[arg(long, default_value_t = 2000)]
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    settle_ms: u64,
}

impl FetchArgs {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// Sitemap listing the article URLs
    #[arg(
        long,
        env = "COURIER_SITEMAP_URL",
        conflicts_with = "feed",
        required_unless_present = "feed"
    )]
    sitemap: Option<String>,

    /// RSS 2.0 feed listing the articles
    #[arg(long, env = "COURIER_FEED_URL")]
    feed: Option<String>,

    /// Write each article as <DIR>/<identifier>.html
    #[arg(
        long,
        env = "COURIER_ARCHIVE_DIR",
        conflicts_with = "cms_url",
        required_unless_present = "cms_url"
    )]
    archive_dir: Option<PathBuf>,

    /// CMS create-article endpoint receiving form posts
    #[arg(long, env = "COURIER_CMS_URL")]
    cms_url: Option<String>,

    /// Maximum number of articles to process (default: 50 archive, 20 CMS)
    #[arg(short = 'n', long, env = "COURIER_MAX_ITEMS")]
    max_items: Option<usize>,

    #[command(flatten)]
    fetch: FetchArgs,

    /// Fixed pause between articles, in milliseconds
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,

    /// Upper bound of the random extra pause between articles, in milliseconds
    #[arg(long, default_value_t = 2000)]
    jitter_ms: u64,

    /// Author used when a page names none
    #[arg(long)]
    fallback_author: Option<String>,

    /// Category used when the URL section matches no known keyword
    #[arg(long)]
    default_category: Option<String>,

    /// Extra article-body container selector (repeatable)
    #[arg(long = "body-selector")]
    body_selectors: Vec<String>,

    /// Print the summary as JSON instead of a single line
    #[arg(long, default_value_t = false)]
    json: bool,
}

enum Source {
    Sitemap(Url),
    Feed(Url),
}

enum Destination {
    Archive(PathBuf),
    Cms(Url),
}

impl HarvestArgs {
    fn source(&self) -> Result<Source> {
        match (&self.sitemap, &self.feed) {
            (Some(sitemap), None) => Ok(Source::Sitemap(validate_endpoint("--sitemap", sitemap)?)),
            (None, Some(feed)) => Ok(Source::Feed(validate_endpoint("--feed", feed)?)),
            _ => bail!("Exactly one of --sitemap or --feed is required"),
        }
    }

    fn destination(&self) -> Result<Destination> {
        match (&self.archive_dir, &self.cms_url) {
            (Some(dir), None) => Ok(Destination::Archive(dir.clone())),
            (None, Some(cms)) => Ok(Destination::Cms(validate_endpoint("--cms-url", cms)?)),
            _ => bail!("Exactly one of --archive-dir or --cms-url is required"),
        }
    }

    fn defaults(&self, destination: &Destination) -> ArticleDefaults {
        let mut defaults = match destination {
            Destination::Archive(_) => ArticleDefaults::archive(),
            Destination::Cms(_) => ArticleDefaults::cms(),
        };
        if let Some(author) = &self.fallback_author {
            defaults = defaults.with_author(author);
        }
        if let Some(category) = &self.default_category {
            defaults = defaults.with_category(category);
        }
        defaults
    }

    fn max_items(&self, destination: &Destination) -> Result<usize> {
        let max = self.max_items.unwrap_or(match destination {
            Destination::Archive(_) => DEFAULT_ARCHIVE_MAX_ITEMS,
            Destination::Cms(_) => DEFAULT_CMS_MAX_ITEMS,
        });
        if max == 0 {
            bail!("--max-items must be at least 1");
        }
        Ok(max)
    }

    fn politeness(&self) -> PolitenessConfig {
        PolitenessConfig::new(Duration::from_millis(self.delay_ms))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("courier=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest(args) => cmd_harvest(&args).await?,
        Commands::Extract {
            url,
            fetch,
            body_selectors,
        } => cmd_extract(&url, &fetch, &body_selectors).await?,
    }

    Ok(())
}

/// Everything a harvest needs besides the fetcher and the discovery source.
struct Pipeline {
    extractor: ScraperExtractor,
    sink: PublicationSink,
    defaults: ArticleDefaults,
    politeness: PolitenessConfig,
}

impl Pipeline {
    async fn run<F: Fetcher, D: Discovery>(self, fetcher: F, discovery: &D) -> Result<HarvestSummary> {
        let service = HarvestService::new(fetcher, self.extractor, self.sink, self.defaults)
            .with_politeness(self.politeness);
        service
            .run(discovery, &TracingHarvestReporter)
            .await
            .context("Harvest aborted")
    }
}

fn extractor_for(selectors: &[String], defaults: ArticleDefaults) -> Result<ScraperExtractor> {
    let rules = ExtractionRules::default().with_body_containers(selectors.iter().cloned());
    ScraperExtractor::with_rules(&rules, defaults).context("Invalid --body-selector")
}

fn sink_for(destination: Destination, timeout: Duration) -> Result<PublicationSink> {
    Ok(match destination {
        Destination::Archive(dir) => PublicationSink::Archive(LocalArchive::new(dir)),
        Destination::Cms(endpoint) => PublicationSink::Remote(
            RemotePublisher::with_timeout(endpoint, timeout)
                .context("Failed to create HTTP client")?,
        ),
    })
}

async fn cmd_harvest(args: &HarvestArgs) -> Result<()> {
    let source = args.source()?;
    let destination = args.destination()?;
    let defaults = args.defaults(&destination);
    let max_items = args.max_items(&destination)?;

    let sink = sink_for(destination, args.fetch.timeout())?;
    tracing::info!("Publishing to {}", sink.describe());

    let pipeline = Pipeline {
        extractor: extractor_for(&args.body_selectors, defaults.clone())?,
        sink,
        defaults,
        politeness: args.politeness(),
    };
    let http =
        ReqwestFetcher::with_timeout(args.fetch.timeout()).context("Failed to create HTTP client")?;

    let summary = match source {
        // Feed items carry their content, so no renderer is launched.
        Source::Feed(url) => {
            let discovery = FeedDiscovery::new(http.clone(), SnippetCleaner::new(), url, max_items);
            pipeline.run(http, &discovery).await?
        }
        Source::Sitemap(url) => {
            let discovery = SitemapDiscovery::new(http.clone(), url, max_items);
            match args.fetch.renderer {
                Renderer::Http => pipeline.run(http, &discovery).await?,
                #[cfg(feature = "browser")]
                Renderer::Browser => {
                    let browser = launch_browser(&args.fetch).await?;
                    pipeline.run(browser, &discovery).await?
                }
                #[cfg(not(feature = "browser"))]
                Renderer::Browser => {
                    bail!("--renderer browser needs a build with the `browser` feature")
                }
            }
        }
    };

    print_summary(&summary, args.json)
}

fn print_summary(summary: &HarvestSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "Done: {} published, {} not published ({} skipped, {} rejected, {} failed) of {} discovered",
            summary.published,
            summary.not_published(),
            summary.skipped,
            summary.rejected,
            summary.failed,
            summary.discovered,
        );
    }
    Ok(())
}

async fn cmd_extract(url: &str, fetch: &FetchArgs, body_selectors: &[String]) -> Result<()> {
    let url = validate_endpoint("--url", url)?;
    let extractor = extractor_for(body_selectors, ArticleDefaults::default())?;

    tracing::info!("Fetching {url}");

    let html = match fetch.renderer {
        Renderer::Http => {
            let fetcher =
                ReqwestFetcher::with_timeout(fetch.timeout()).context("Failed to create HTTP client")?;
            fetch_once(fetcher, url.as_str()).await?
        }
        #[cfg(feature = "browser")]
        Renderer::Browser => fetch_once(launch_browser(fetch).await?, url.as_str()).await?,
        #[cfg(not(feature = "browser"))]
        Renderer::Browser => bail!("--renderer browser needs a build with the `browser` feature"),
    };

    tracing::info!("Fetched {} bytes of HTML", html.len());

    let fields = extractor.extract(&html);
    println!("{}", serde_json::to_string_pretty(&fields)?);

    Ok(())
}

async fn fetch_once<F: Fetcher>(fetcher: F, url: &str) -> Result<String> {
    let result = fetcher.fetch(url).await;
    fetcher.shutdown().await;
    result.with_context(|| format!("Failed to fetch {url}"))
}

#[cfg(feature = "browser")]
async fn launch_browser(fetch: &FetchArgs) -> Result<courier_client::BrowserFetcher> {
    let fetcher = courier_client::BrowserFetcher::with_timeout(fetch.timeout())
        .await
        .context("Failed to launch headless browser")?;
    Ok(fetcher.with_settle_delay(Duration::from_millis(fetch.settle_ms)))
}
