use serde::Serialize;

use crate::error::AppError;

/// Where a [`SourceReference`] was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoveryOrigin {
    /// A `<loc>` entry of a sitemap. The page must still be fetched.
    Sitemap,
    /// An item of a syndication feed, carrying its already-extracted fields.
    Feed { fields: ExtractionResult },
}

/// A candidate article URL plus how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReference {
    pub url: String,
    /// 1-based position within the batch.
    pub position: usize,
    pub origin: DiscoveryOrigin,
}

impl SourceReference {
    pub fn sitemap(url: impl Into<String>, position: usize) -> Self {
        Self {
            url: url.into(),
            position,
            origin: DiscoveryOrigin::Sitemap,
        }
    }

    pub fn feed(url: impl Into<String>, position: usize, fields: ExtractionResult) -> Self {
        Self {
            url: url.into(),
            position,
            origin: DiscoveryOrigin::Feed { fields },
        }
    }
}

/// Best-available field values pulled out of a document.
///
/// Every field is a plain `String`: empty means "unknown", never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub title: String,
    pub author: String,
    pub published_date: String,
    pub body_text: String,
    pub image_url: String,
}

/// The canonical article record handed to a publication sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedArticle {
    pub title: String,
    /// Filesystem- and URL-safe identifier derived from the source URL.
    pub identifier: String,
    pub category: String,
    pub author: String,
    pub body_text: String,
    /// `YYYY-MM-DD` or empty.
    pub published_date: String,
    pub image_url: String,
    pub source_url: String,
}

/// Result of handing one article to a publication sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublicationOutcome {
    /// `destination` is the written file path or the accepted-response marker.
    Published { destination: String },
    Failed { cause: String },
}

impl From<Result<String, AppError>> for PublicationOutcome {
    fn from(result: Result<String, AppError>) -> Self {
        match result {
            Ok(destination) => PublicationOutcome::Published { destination },
            Err(e) => PublicationOutcome::Failed {
                cause: e.to_string(),
            },
        }
    }
}

/// Final state of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Published { destination: String },
    /// The sink was reached but did not accept the article.
    PublishFailed { cause: String },
    /// Retrieval or any other pre-publication stage failed.
    Skipped { reason: String },
    /// Normalization rejected the record (body too short).
    Rejected { length: usize, minimum: usize },
}

impl ItemStatus {
    /// Single-character marker used in the progress log.
    pub fn symbol(&self) -> &'static str {
        match self {
            ItemStatus::Published { .. } => "✓",
            ItemStatus::PublishFailed { .. } | ItemStatus::Skipped { .. } => "✗",
            ItemStatus::Rejected { .. } => "⚠",
        }
    }
}

impl From<PublicationOutcome> for ItemStatus {
    fn from(outcome: PublicationOutcome) -> Self {
        match outcome {
            PublicationOutcome::Published { destination } => ItemStatus::Published { destination },
            PublicationOutcome::Failed { cause } => ItemStatus::PublishFailed { cause },
        }
    }
}

/// Per-item line of the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub position: usize,
    pub url: String,
    pub identifier: String,
    pub status: ItemStatus,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    pub discovered: usize,
    pub published: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
    pub items: Vec<ItemReport>,
}

impl HarvestSummary {
    pub fn with_discovered(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    pub fn record(&mut self, report: ItemReport) {
        match report.status {
            ItemStatus::Published { .. } => self.published += 1,
            ItemStatus::PublishFailed { .. } => self.failed += 1,
            ItemStatus::Skipped { .. } => self.skipped += 1,
            ItemStatus::Rejected { .. } => self.rejected += 1,
        }
        self.items.push(report);
    }

    /// Every item that was processed but not published.
    pub fn not_published(&self) -> usize {
        self.skipped + self.rejected + self.failed
    }
}
