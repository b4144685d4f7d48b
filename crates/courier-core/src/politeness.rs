//! Randomised inter-item delays for polite harvesting.
//!
//! The orchestrator processes one item at a time against a single site, so
//! politeness is a plain base delay plus uniform jitter awaited between
//! consecutive items.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use courier_core::politeness::PolitenessConfig;
//!
//! // 2 s base delay plus up to 2 s of jitter
//! let config = PolitenessConfig::new(Duration::from_secs(2))
//!     .with_jitter(Duration::from_secs(2));
//! assert!(config.effective_delay() >= Duration::from_secs(2));
//! ```

use std::time::Duration;

use rand::Rng;

/// Delay applied between two consecutive batch items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolitenessConfig {
    /// Minimum pause between items.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter)).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub jitter: Duration,
}

impl PolitenessConfig {
    /// Create a new config with the given delay and no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// No pause at all. Used by tests and single-item runs.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Add random jitter (uniform [0, jitter)) on top of the base delay.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Compute the effective delay for a single wait (delay + random jitter).
    pub fn effective_delay(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return self.delay;
        }
        let jitter_ms = rand::rng().random_range(0..max_ms);
        self.delay + Duration::from_millis(jitter_ms)
    }

    /// Sleep for one effective delay.
    pub async fn pause(&self) {
        let wait = self.effective_delay();
        if wait.is_zero() {
            return;
        }
        tracing::debug!(sleep_ms = %wait.as_millis(), "Politeness delay");
        tokio::time::sleep(wait).await;
    }
}

impl Default for PolitenessConfig {
    /// 2 seconds plus up to 2 seconds of jitter (2-4 s total).
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            jitter: Duration::from_secs(2),
        }
    }
}
