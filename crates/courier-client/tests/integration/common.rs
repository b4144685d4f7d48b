use axum::Router;

pub const LONG_BODY: &str = "The committee met for six hours on Wednesday and agreed to send the bill to the full chamber next week.";

/// Bind an ephemeral port, build the router with the resulting base URL and
/// serve it in the background. Returns the base URL (no trailing slash).
pub async fn spawn_site<B>(build: B) -> String
where
    B: FnOnce(&str) -> Router,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = build(&base);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

pub fn sitemap_xml(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{u}</loc></url>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</urlset>"
    )
}

pub fn article_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head>
<meta property="article:published_time" content="2024-05-01T09:00:00Z">
</head><body>
<h1>{title}</h1>
<span class="author-name">Pat Doe</span>
<div id="article-body"><p>{body}</p></div>
</body></html>"#
    )
}
