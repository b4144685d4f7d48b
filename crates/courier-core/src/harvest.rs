use crate::config::ArticleDefaults;
use crate::error::AppError;
use crate::models::{
    DiscoveryOrigin, HarvestSummary, ItemReport, ItemStatus, NormalizedArticle, PublicationOutcome,
    SourceReference,
};
use crate::normalize::{identifier_for_url, normalize};
use crate::politeness::PolitenessConfig;
use crate::traits::{Discovery, Extractor, Fetcher, Publisher};
use crate::util::truncate_for_log;

/// Maximum URL length shown in progress lines.
const LOG_URL_CHARS: usize = 80;

/// Events emitted by the harvest loop for monitoring/logging.
#[derive(Debug, Clone)]
pub enum HarvestEvent<'a> {
    DiscoveryStarted,
    Discovered {
        count: usize,
    },
    DiscoveryFailed {
        error: &'a str,
    },
    ItemStarted {
        position: usize,
        total: usize,
        url: &'a str,
    },
    ItemFinished {
        total: usize,
        report: &'a ItemReport,
    },
    SessionClosed,
    Finished {
        summary: &'a HarvestSummary,
    },
}

/// Trait for receiving harvest events (decoupled logging).
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHarvestReporter;

impl HarvestReporter for TracingHarvestReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        match event {
            HarvestEvent::DiscoveryStarted => {
                tracing::info!("Discovering articles");
            }
            HarvestEvent::Discovered { count } => {
                tracing::info!(%count, "Found {count} articles");
            }
            HarvestEvent::DiscoveryFailed { error } => {
                tracing::error!(%error, "Discovery failed, nothing to do");
            }
            HarvestEvent::ItemStarted {
                position,
                total,
                url,
            } => {
                let url = truncate_for_log(url, LOG_URL_CHARS);
                tracing::info!("Processing {position}/{total}: {url}");
            }
            HarvestEvent::ItemFinished { total, report } => {
                let position = report.position;
                let id = &report.identifier;
                let symbol = report.status.symbol();
                match &report.status {
                    ItemStatus::Published { destination } => {
                        tracing::info!(%destination, "{symbol} {position}/{total} {id}: published");
                    }
                    ItemStatus::PublishFailed { cause } => {
                        tracing::warn!(%cause, "{symbol} {position}/{total} {id}: publish failed");
                    }
                    ItemStatus::Skipped { reason } => {
                        let url = truncate_for_log(&report.url, LOG_URL_CHARS);
                        tracing::warn!(%reason, %url, "{symbol} {position}/{total} {id}: skipped");
                    }
                    ItemStatus::Rejected { length, minimum } => {
                        tracing::warn!(
                            %length,
                            %minimum,
                            "{symbol} {position}/{total} {id}: content too short or missing"
                        );
                    }
                }
            }
            HarvestEvent::SessionClosed => {
                tracing::debug!("Fetcher session closed");
            }
            HarvestEvent::Finished { summary } => {
                tracing::info!(
                    discovered = summary.discovered,
                    published = summary.published,
                    skipped = summary.skipped,
                    rejected = summary.rejected,
                    failed = summary.failed,
                    "Harvest complete"
                );
            }
        }
    }
}

/// Drives discover → retrieve → extract → normalize → publish over a batch.
///
/// Items are processed strictly one after another. Each item runs inside its
/// own `Result` boundary: whatever fails is recorded in the summary and the
/// loop moves on. Only discovery failures abort the run.
pub struct HarvestService<F, E, P>
where
    F: Fetcher,
    E: Extractor,
    P: Publisher,
{
    fetcher: F,
    extractor: E,
    publisher: P,
    defaults: ArticleDefaults,
    politeness: PolitenessConfig,
}

impl<F, E, P> HarvestService<F, E, P>
where
    F: Fetcher,
    E: Extractor,
    P: Publisher,
{
    pub fn new(fetcher: F, extractor: E, publisher: P, defaults: ArticleDefaults) -> Self {
        Self {
            fetcher,
            extractor,
            publisher,
            defaults,
            politeness: PolitenessConfig::default(),
        }
    }

    pub fn with_politeness(mut self, politeness: PolitenessConfig) -> Self {
        self.politeness = politeness;
        self
    }

    /// Run a full batch. The fetcher is shut down on every exit path.
    pub async fn run<D: Discovery, R: HarvestReporter>(
        &self,
        discovery: &D,
        reporter: &R,
    ) -> Result<HarvestSummary, AppError> {
        let result = self.run_batch(discovery, reporter).await;

        self.fetcher.shutdown().await;
        reporter.report(HarvestEvent::SessionClosed);

        if let Ok(summary) = &result {
            reporter.report(HarvestEvent::Finished { summary });
        }
        result
    }

    async fn run_batch<D: Discovery, R: HarvestReporter>(
        &self,
        discovery: &D,
        reporter: &R,
    ) -> Result<HarvestSummary, AppError> {
        reporter.report(HarvestEvent::DiscoveryStarted);
        let sources = match discovery.discover().await {
            Ok(sources) if sources.is_empty() => {
                let err = AppError::Discovery("no articles found".into());
                reporter.report(HarvestEvent::DiscoveryFailed {
                    error: &err.to_string(),
                });
                return Err(err);
            }
            Ok(sources) => sources,
            Err(e) => {
                reporter.report(HarvestEvent::DiscoveryFailed {
                    error: &e.to_string(),
                });
                return Err(e);
            }
        };

        let total = sources.len();
        reporter.report(HarvestEvent::Discovered { count: total });

        let mut summary = HarvestSummary::with_discovered(total);
        for (index, source) in sources.iter().enumerate() {
            reporter.report(HarvestEvent::ItemStarted {
                position: source.position,
                total,
                url: &source.url,
            });

            let report = self.process_item(source).await;
            reporter.report(HarvestEvent::ItemFinished {
                total,
                report: &report,
            });
            summary.record(report);

            if index + 1 < total {
                self.politeness.pause().await;
            }
        }

        Ok(summary)
    }

    async fn process_item(&self, source: &SourceReference) -> ItemReport {
        let status = match self.prepare(source).await {
            Ok(article) => {
                let outcome = PublicationOutcome::from(self.publisher.publish(&article).await);
                ItemStatus::from(outcome)
            }
            Err(AppError::ContentTooShort { length, minimum }) => {
                ItemStatus::Rejected { length, minimum }
            }
            Err(e) => ItemStatus::Skipped {
                reason: e.to_string(),
            },
        };

        ItemReport {
            position: source.position,
            url: source.url.clone(),
            identifier: identifier_for_url(&source.url, source.position),
            status,
        }
    }

    /// Retrieve (sitemap items only), extract and normalize one source.
    async fn prepare(&self, source: &SourceReference) -> Result<NormalizedArticle, AppError> {
        let extraction = match &source.origin {
            DiscoveryOrigin::Sitemap => {
                let html = self.fetcher.fetch(&source.url).await?;
                tracing::debug!(bytes = html.len(), "Fetched page");
                self.extractor.extract(&html)
            }
            DiscoveryOrigin::Feed { fields } => fields.clone(),
        };
        normalize(&extraction, source, &self.defaults)
    }
}
