//! Rule-driven article extraction over rendered HTML.
//!
//! Each field has an ordered list of [`Strategy`] values (a CSS selector plus
//! where to read the value from). The evaluator walks the list and keeps the
//! first non-empty value, so site templates that disagree on markup are
//! handled by adding rules rather than branches.

use std::sync::Arc;

use courier_core::config::ArticleDefaults;
use courier_core::error::AppError;
use courier_core::models::ExtractionResult;
use courier_core::traits::Extractor;
use scraper::{ElementRef, Html, Selector};

/// Tags whose text never counts as article content.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Where a matched element's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Visible text of the element, whitespace-collapsed.
    Text,
    /// Value of the named attribute.
    Attr(String),
}

/// One way of reading a field: selector + accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub selector: String,
    pub source: ValueSource,
}

impl Strategy {
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            source: ValueSource::Text,
        }
    }

    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            source: ValueSource::Attr(attr.into()),
        }
    }
}

/// Ordered fallback chains for every article field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRules {
    pub title: Vec<Strategy>,
    pub author: Vec<Strategy>,
    pub published_date: Vec<Strategy>,
    /// Known article-body containers, most specific first.
    pub body_containers: Vec<String>,
    /// Used when no container yields a long enough body.
    pub body_fallback: Vec<Strategy>,
    pub image_url: Vec<Strategy>,
}

impl ExtractionRules {
    /// Append extra body containers, tried after the built-in ones.
    pub fn with_body_containers<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body_containers
            .extend(selectors.into_iter().map(Into::into));
        self
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            title: vec![
                Strategy::text("h1"),
                Strategy::attr(r#"meta[property="og:title"]"#, "content"),
            ],
            author: vec![
                Strategy::text(".author-name"),
                Strategy::attr(r#"meta[name="author"]"#, "content"),
            ],
            published_date: vec![Strategy::attr(
                r#"meta[property="article:published_time"]"#,
                "content",
            )],
            body_containers: vec![
                "#article-body".to_string(),
                ".article-text".to_string(),
                ".bigtext".to_string(),
            ],
            body_fallback: vec![
                Strategy::attr(r#"meta[property="og:description"]"#, "content"),
                Strategy::attr(r#"meta[name="description"]"#, "content"),
            ],
            image_url: vec![Strategy::attr(r#"meta[property="og:image"]"#, "content")],
        }
    }
}

struct CompiledStrategy {
    selector: Selector,
    source: ValueSource,
}

struct CompiledRules {
    title: Vec<CompiledStrategy>,
    author: Vec<CompiledStrategy>,
    published_date: Vec<CompiledStrategy>,
    body_containers: Vec<Selector>,
    body_fallback: Vec<CompiledStrategy>,
    image_url: Vec<CompiledStrategy>,
    paragraph: Selector,
}

fn compile_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e}")))
}

fn compile_chain(chain: &[Strategy]) -> Result<Vec<CompiledStrategy>, AppError> {
    chain
        .iter()
        .map(|s| {
            Ok(CompiledStrategy {
                selector: compile_selector(&s.selector)?,
                source: s.source.clone(),
            })
        })
        .collect()
}

/// [`Extractor`] backed by the `scraper` HTML parser.
///
/// Selectors are compiled once at construction; invalid selectors are a
/// configuration error. Extraction itself never fails.
#[derive(Clone)]
pub struct ScraperExtractor {
    rules: Arc<CompiledRules>,
    defaults: ArticleDefaults,
}

impl ScraperExtractor {
    /// Extractor with the built-in rules.
    pub fn new(defaults: ArticleDefaults) -> Result<Self, AppError> {
        Self::with_rules(&ExtractionRules::default(), defaults)
    }

    pub fn with_rules(rules: &ExtractionRules, defaults: ArticleDefaults) -> Result<Self, AppError> {
        let compiled = CompiledRules {
            title: compile_chain(&rules.title)?,
            author: compile_chain(&rules.author)?,
            published_date: compile_chain(&rules.published_date)?,
            body_containers: rules
                .body_containers
                .iter()
                .map(|s| compile_selector(s))
                .collect::<Result<_, _>>()?,
            body_fallback: compile_chain(&rules.body_fallback)?,
            image_url: compile_chain(&rules.image_url)?,
            paragraph: compile_selector("p")?,
        };

        Ok(Self {
            rules: Arc::new(compiled),
            defaults,
        })
    }

    /// Body text from the first container with any text, preferring
    /// paragraph-by-paragraph reconstruction over flattened text.
    fn body_from_containers(&self, document: &Html) -> String {
        for container_selector in &self.rules.body_containers {
            let Some(container) = document.select(container_selector).next() else {
                continue;
            };

            let paragraphs: Vec<String> = container
                .select(&self.rules.paragraph)
                .map(|p| collapse_whitespace(&visible_text(p)))
                .filter(|t| !t.is_empty())
                .collect();
            if !paragraphs.is_empty() {
                return paragraphs.join("\n\n");
            }

            let flattened = flatten_text(container);
            if !flattened.is_empty() {
                return flattened;
            }
        }
        String::new()
    }
}

impl Extractor for ScraperExtractor {
    fn extract(&self, html: &str) -> ExtractionResult {
        let document = Html::parse_document(html);
        let rules = &self.rules;

        let title = first_value(&document, &rules.title).unwrap_or_else(|| self.defaults.title.clone());
        let author =
            first_value(&document, &rules.author).unwrap_or_else(|| self.defaults.author.clone());
        let published_date = first_value(&document, &rules.published_date)
            .map(|d| d.chars().take(10).collect())
            .unwrap_or_default();

        let mut body_text = self.body_from_containers(&document);
        if body_text.chars().count() < self.defaults.min_body_length {
            if let Some(description) = first_value(&document, &rules.body_fallback) {
                body_text = description;
            }
        }

        let image_url = first_value(&document, &rules.image_url).unwrap_or_default();

        ExtractionResult {
            title,
            author,
            published_date,
            body_text,
            image_url,
        }
    }
}

/// Evaluate a chain: the first strategy whose first match yields a
/// non-empty value wins.
fn first_value(document: &Html, chain: &[CompiledStrategy]) -> Option<String> {
    chain.iter().find_map(|strategy| {
        let element = document.select(&strategy.selector).next()?;
        let value = match &strategy.source {
            ValueSource::Text => collapse_whitespace(&visible_text(element)),
            ValueSource::Attr(name) => element.value().attr(name)?.trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    })
}

/// Text nodes of an element, skipping script-like children.
fn visible_text(element: ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent_tag = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name().to_string()));
            match parent_tag {
                Some(tag) if NON_CONTENT_TAGS.contains(&tag.as_str()) => None,
                _ => Some(&**text),
            }
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Container text with per-line whitespace collapsed and blank lines dropped.
fn flatten_text(element: ElementRef<'_>) -> String {
    visible_text(element)
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
