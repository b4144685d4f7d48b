use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use courier_core::error::AppError;
use courier_core::traits::Fetcher;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::fetcher::{DEFAULT_TIMEOUT, DESKTOP_USER_AGENT};

/// Pause after navigation so deferred rendering can finish.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// How often the page's network activity is sampled while waiting for it to
/// go quiet.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The page must stay quiet this long to count as idle.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Requests allowed in flight while still counting as quiet. Long-polling
/// beacons and analytics sockets would otherwise never let a page settle.
const IDLE_MAX_IN_FLIGHT: usize = 2;

/// Counts the page's in-flight requests from CDP network events.
///
/// Requests are keyed by id, so redirects (which reuse the id) count once.
/// The listener tasks stop when the tracker is dropped.
struct NetworkTracker {
    in_flight: Arc<std::sync::Mutex<HashSet<String>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl NetworkTracker {
    async fn attach(page: &Page) -> Result<Self, AppError> {
        let listen_err = |e: chromiumoxide::error::CdpError| {
            AppError::BrowserError(format!("Failed to watch network: {e}"))
        };
        let mut sent = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(listen_err)?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(listen_err)?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(listen_err)?;

        let in_flight = Arc::new(std::sync::Mutex::new(HashSet::new()));

        let started = Arc::clone(&in_flight);
        let on_sent = tokio::spawn(async move {
            while let Some(event) = sent.next().await {
                let id: &str = event.request_id.as_ref();
                if let Ok(mut set) = started.lock() {
                    set.insert(id.to_string());
                }
            }
        });

        let done = Arc::clone(&in_flight);
        let on_finished = tokio::spawn(async move {
            while let Some(event) = finished.next().await {
                let id: &str = event.request_id.as_ref();
                if let Ok(mut set) = done.lock() {
                    set.remove(id);
                }
            }
        });

        let done = Arc::clone(&in_flight);
        let on_failed = tokio::spawn(async move {
            while let Some(event) = failed.next().await {
                let id: &str = event.request_id.as_ref();
                if let Ok(mut set) = done.lock() {
                    set.remove(id);
                }
            }
        });

        Ok(Self {
            in_flight,
            tasks: vec![on_sent, on_finished, on_failed],
        })
    }

    fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }
}

impl Drop for NetworkTracker {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Unlike [`super::ReqwestFetcher`], this renders JavaScript before returning
/// the HTML, so content injected by scripts after load is captured.
///
/// One Chromium process and one page (tab) are shared by all clones and
/// reused for every [`Fetcher::fetch`] call of a batch. Calls are serialised
/// through the page lock. A failed navigation resets the page (or replaces
/// it) so later items start from a clean tab.
///
/// # Example
///
/// ```rust,no_run
/// use courier_client::BrowserFetcher;
/// use courier_core::traits::Fetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::new().await?;
/// let html = fetcher.fetch("https://example.com").await?;
/// println!("{}", &html[..200]);
/// fetcher.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserFetcher {
    session: Arc<Mutex<Session>>,
    timeout: Duration,
    settle_delay: Duration,
}

struct Session {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl BrowserFetcher {
    /// Launches a headless Chromium browser with a **30 s** navigation timeout
    /// and a **2 s** settle delay.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`, or `$CHROME_BIN`).
    pub async fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT).await
    }

    /// Launches a headless Chromium browser with a custom navigation timeout.
    pub async fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags, so prefer the real binary when we can find it.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-setuid-sandbox")
            .arg("--no-first-run")
            .arg(format!("--user-agent={DESKTOP_USER_AGENT}"))
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open page: {e}")))?;

        Ok(Self {
            session: Arc::new(Mutex::new(Session {
                browser: Some(browser),
                page: Some(page),
                handler: Some(handler),
            })),
            timeout,
            settle_delay: DEFAULT_SETTLE_DELAY,
        })
    }

    /// Override the pause applied after each navigation.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// `$CHROME_BIN` wins; otherwise well-known install paths are probed.
    /// Returns `None` to let `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Navigate and wait until the page's network activity has gone quiet.
    async fn render(page: &Page, url: &str) -> Result<String, AppError> {
        let tracker = NetworkTracker::attach(page).await?;

        page.goto(url)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))?;

        Self::wait_for_network_idle(page, &tracker).await?;

        page.content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }

    /// Poll until the document is complete and no more than
    /// [`IDLE_MAX_IN_FLIGHT`] requests have been pending for [`IDLE_WINDOW`].
    /// Bounded by the caller's navigation timeout.
    async fn wait_for_network_idle(page: &Page, tracker: &NetworkTracker) -> Result<(), AppError> {
        let mut quiet_for = Duration::ZERO;

        loop {
            let ready_state: String = page
                .evaluate("document.readyState")
                .await
                .map_err(|e| AppError::BrowserError(format!("Ready-state check failed: {e}")))?
                .into_value()
                .map_err(|e| AppError::BrowserError(format!("Unexpected ready-state value: {e}")))?;

            if is_quiet(&ready_state, tracker.in_flight()) {
                quiet_for += IDLE_POLL_INTERVAL;
                if quiet_for >= IDLE_WINDOW {
                    return Ok(());
                }
            } else {
                quiet_for = Duration::ZERO;
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Bring the shared session back to a usable state after a failure.
    async fn recover(session: &mut Session) {
        if let Some(page) = &session.page {
            if page.goto("about:blank").await.is_ok() {
                return;
            }
        }

        tracing::warn!("Page unresponsive, opening a fresh tab");
        if let Some(old) = session.page.take() {
            let _ = old.close().await;
        }
        if let Some(browser) = &session.browser {
            match browser.new_page("about:blank").await {
                Ok(page) => session.page = Some(page),
                Err(e) => tracing::error!(error = %e, "Failed to open replacement page"),
            }
        }
    }
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let mut session = self.session.lock().await;
        let page = session
            .page
            .clone()
            .ok_or_else(|| AppError::BrowserError("Browser session is closed".into()))?;

        let result = match tokio::time::timeout(self.timeout, Self::render(&page, url)).await {
            Ok(inner) => inner,
            Err(_) => Err(AppError::Timeout(self.timeout)),
        };

        match result {
            Ok(html) => {
                tokio::time::sleep(self.settle_delay).await;
                // Late DOM mutations during the settle delay are worth keeping.
                Ok(page.content().await.unwrap_or(html))
            }
            Err(e) => {
                Self::recover(&mut session).await;
                Err(e)
            }
        }
    }

    async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        if let Some(page) = session.page.take() {
            let _ = page.close().await;
        }
        if let Some(mut browser) = session.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "Failed to close browser cleanly");
            }
            let _ = browser.wait().await;
            tracing::info!("Browser closed");
        }
        if let Some(handler) = session.handler.take() {
            handler.abort();
        }
    }
}

fn is_quiet(ready_state: &str, in_flight: usize) -> bool {
    ready_state == "complete" && in_flight <= IDLE_MAX_IN_FLIGHT
}
