//! Turns an [`ExtractionResult`] into a publishable [`NormalizedArticle`].
//!
//! Everything here is pure: the same inputs always produce the same record.

use url::Url;

use crate::config::{ArticleDefaults, CATEGORY_KEYWORDS};
use crate::error::AppError;
use crate::models::{ExtractionResult, NormalizedArticle, SourceReference};

/// Build the canonical record for one source item.
///
/// Fails with [`AppError::ContentTooShort`] when the trimmed body has fewer
/// than `defaults.min_body_length` characters; callers must skip the item.
pub fn normalize(
    extraction: &ExtractionResult,
    source: &SourceReference,
    defaults: &ArticleDefaults,
) -> Result<NormalizedArticle, AppError> {
    let body_text = extraction.body_text.trim();
    let length = body_text.chars().count();
    if length < defaults.min_body_length {
        return Err(AppError::ContentTooShort {
            length,
            minimum: defaults.min_body_length,
        });
    }

    let segments = path_segments(&source.url);

    Ok(NormalizedArticle {
        title: or_default(&extraction.title, &defaults.title),
        identifier: derive_identifier(&segments, source.position),
        category: infer_category(&segments, &defaults.category),
        author: or_default(&extraction.author, &defaults.author),
        body_text: body_text.to_string(),
        published_date: date_prefix(&extraction.published_date),
        image_url: extraction.image_url.trim().to_string(),
        source_url: source.url.clone(),
    })
}

/// Map the first path segment of a URL onto a category label.
pub fn category_for_url(url: &str, default: &str) -> String {
    infer_category(&path_segments(url), default)
}

/// Identifier for a URL: its last non-empty path segment, made safe for use
/// as a file name, or `article-<position>`.
pub fn identifier_for_url(url: &str, position: usize) -> String {
    derive_identifier(&path_segments(url), position)
}

/// Reduce a timestamp to its `YYYY-MM-DD` prefix. Anything that does not
/// start with a date yields an empty string.
pub fn date_prefix(raw: &str) -> String {
    let prefix: String = raw.trim().chars().take(10).collect();
    let bytes = prefix.as_bytes();
    let looks_like_date = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if looks_like_date { prefix } else { String::new() }
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn infer_category(segments: &[String], default: &str) -> String {
    let Some(section) = segments.first() else {
        return default.to_string();
    };
    let section = section.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| section.contains(keyword))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| default.to_string())
}

fn derive_identifier(segments: &[String], position: usize) -> String {
    segments
        .last()
        .map(|s| slugify_segment(s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("article-{position}"))
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `-`, and never start
/// with a dot so the result cannot escape the archive directory.
fn slugify_segment(segment: &str) -> String {
    let mapped: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    mapped.trim_start_matches('.').trim_matches('-').to_string()
}

/// Non-empty path segments of an absolute URL or a bare path.
fn path_segments(raw: &str) -> Vec<String> {
    let path = match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
