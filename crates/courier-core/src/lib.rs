pub mod config;
pub mod error;
pub mod harvest;
pub mod models;
pub mod normalize;
pub mod politeness;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::{ArticleDefaults, validate_endpoint};
pub use error::AppError;
pub use harvest::{HarvestReporter, HarvestService, TracingHarvestReporter};
pub use models::{
    DiscoveryOrigin, ExtractionResult, HarvestSummary, ItemReport, ItemStatus, NormalizedArticle,
    PublicationOutcome, SourceReference,
};
pub use normalize::normalize;
pub use politeness::PolitenessConfig;
pub use traits::{Cleaner, Discovery, Extractor, Fetcher, Publisher};
