use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_core::error::AppError;
use courier_core::models::NormalizedArticle;
use courier_core::traits::Publisher;
use html_escape::{encode_double_quoted_attribute, encode_text};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use url::Url;

use crate::fetcher::{DEFAULT_TIMEOUT, DESKTOP_USER_AGENT};

const ARCHIVE_STYLE: &str = "body{font-family:Georgia,serif;margin:40px auto;max-width:800px;line-height:1.8;color:#333}
h1{font-size:2.5em;margin-bottom:0.2em}
.meta{color:#666;border-bottom:1px solid #ddd;padding-bottom:10px;margin-bottom:20px}
.content{font-size:1.1em}";

/// Writes each article as a standalone, readable HTML page under a root
/// directory. Re-publishing the same identifier overwrites the file.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, article: &NormalizedArticle) -> PathBuf {
        self.root.join(format!("{}.html", article.identifier))
    }
}

/// Render the archive page. Every interpolated field is escaped.
pub fn render_archive_page(article: &NormalizedArticle) -> String {
    let title = encode_text(&article.title);
    let byline = if article.published_date.is_empty() {
        encode_text(&article.author).into_owned()
    } else {
        format!(
            "{} • {}",
            encode_text(&article.author),
            encode_text(&article.published_date)
        )
    };
    let body = encode_text(&article.body_text);
    let href = encode_double_quoted_attribute(&article.source_url);
    let source = encode_text(&article.source_url);

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>{title}</title>
<style>{ARCHIVE_STYLE}
</style>
</head><body>
<h1>{title}</h1>
<div class="meta"><strong>{byline}</strong></div>
<div class="content"><pre style="white-space:pre-wrap;font-family:Georgia,serif">{body}</pre></div>
<hr><small>Source: <a href="{href}">{source}</a></small>
</body></html>
"#
    )
}

impl Publisher for LocalArchive {
    async fn publish(&self, article: &NormalizedArticle) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(article);
        tokio::fs::write(&path, render_archive_page(article)).await?;
        Ok(path.display().to_string())
    }
}

/// Submits articles to a CMS create endpoint as a URL-encoded form.
///
/// Redirects are not followed: a 3xx answer (typically the CMS bouncing back
/// to its list view) counts as accepted.
#[derive(Clone)]
pub struct RemotePublisher {
    client: Client,
    endpoint: Url,
}

impl RemotePublisher {
    pub fn new(endpoint: Url) -> Result<Self, AppError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `title`, `category`, `content` and `author`, in that order.
pub fn form_body(article: &NormalizedArticle) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("title", &article.title)
        .append_pair("category", &article.category)
        .append_pair("content", &article.body_text)
        .append_pair("author", &article.author)
        .finish()
}

impl Publisher for RemotePublisher {
    async fn publish(&self, article: &NormalizedArticle) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body(article))
            .send()
            .await
            .map_err(|e| AppError::Publish(format!("Request to {} failed: {e}", self.endpoint)))?;

        let status = response.status().as_u16();
        if (200..400).contains(&status) {
            Ok(format!("HTTP {status}"))
        } else {
            Err(AppError::Publish(format!("CMS answered HTTP {status}")))
        }
    }
}

/// The configured destination for a run.
#[derive(Clone)]
pub enum PublicationSink {
    Archive(LocalArchive),
    Remote(RemotePublisher),
}

impl PublicationSink {
    pub fn describe(&self) -> String {
        match self {
            PublicationSink::Archive(archive) => archive.root().display().to_string(),
            PublicationSink::Remote(remote) => remote.endpoint().to_string(),
        }
    }
}

impl Publisher for PublicationSink {
    async fn publish(&self, article: &NormalizedArticle) -> Result<String, AppError> {
        match self {
            PublicationSink::Archive(archive) => archive.publish(article).await,
            PublicationSink::Remote(remote) => remote.publish(article).await,
        }
    }
}
