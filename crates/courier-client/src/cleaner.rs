use std::sync::Arc;

use courier_core::error::AppError;
use courier_core::traits::Cleaner;
use htmd::HtmlToMarkdown;

/// Turns feed-item HTML (descriptions, `content:encoded`) into readable text.
///
/// Conversion goes through htmd, so links and emphasis survive as Markdown,
/// which the CMS renders. Media and scripting tags are dropped and runs of
/// blank lines are collapsed.
#[derive(Clone)]
pub struct SnippetCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl SnippetCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "script", "style", "img", "figure", "picture", "video", "iframe", "svg",
                "noscript",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }
}

impl Default for SnippetCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for SnippetCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::FeedError(format!("Failed to convert feed HTML: {e}")))?;

        let mut text = String::with_capacity(markdown.len());
        let mut blank_run = 0;
        for line in markdown.lines().map(str::trim_end) {
            if line.trim().is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            text.push_str(line);
            text.push('\n');
        }
        Ok(text.trim().to_string())
    }
}
