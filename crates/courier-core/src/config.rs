use url::Url;

use crate::error::AppError;

/// Minimum number of characters a body must have to be published.
pub const MIN_BODY_LENGTH: usize = 50;

/// Section keyword → category label, checked in order against the first
/// path segment of an article URL.
pub const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("world", "World"),
    ("business", "Business"),
    ("economy", "Business"),
    ("tech", "Technology"),
    ("sport", "Sports"),
    ("entertain", "Entertainment"),
];

/// Fallback literals and validation thresholds shared by extraction and
/// normalization. Built once per run and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDefaults {
    pub title: String,
    pub author: String,
    pub category: String,
    pub min_body_length: usize,
}

impl ArticleDefaults {
    /// Defaults used when building a local offline archive.
    pub fn archive() -> Self {
        Self {
            author: "Staff".to_string(),
            ..Self::default()
        }
    }

    /// Defaults used when republishing to a CMS.
    pub fn cms() -> Self {
        Self {
            author: "Staff Writer".to_string(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

impl Default for ArticleDefaults {
    fn default() -> Self {
        Self {
            title: "Article".to_string(),
            author: "Staff".to_string(),
            category: "Politics".to_string(),
            min_body_length: MIN_BODY_LENGTH,
        }
    }
}

/// Validate a user-supplied endpoint URL (discovery source or CMS target).
///
/// Only absolute `http`/`https` URLs with a host are accepted. `name` is the
/// setting being validated and only appears in error messages.
pub fn validate_endpoint(name: &str, raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::ConfigError(format!("{name}: invalid URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::ConfigError(format!(
                "{name}: URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AppError::ConfigError(format!("{name}: URL has no host"))),
    }
}
