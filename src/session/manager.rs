use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::handler::Handler;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::time::timeout;

use super::store::{SessionHandle, SessionStore};
use crate::browser::{http_client, BrowserLauncher};
use crate::config::Config;
use crate::error::{Result, WebpilotError};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Page info from the CDP /json/list endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub page_type: String,
}

/// A live browser connection, owned for the duration of one invocation.
/// The browser process itself outlives this and is reachable again via
/// the persisted [`SessionHandle`].
pub struct Session {
    /// Held so the CDP connection stays open while the page is driven
    #[allow(dead_code)]
    pub browser: Browser,
    pub page: Page,
}

#[derive(Debug)]
pub enum SessionStatus {
    Running {
        handle: SessionHandle,
        pages: Vec<PageInfo>,
    },
    Stale,
    NotRunning,
}

/// Resolves each command to a live browser + page, reattaching to the
/// persisted session when the referenced browser is still reachable.
pub struct SessionManager {
    config: Config,
    store: SessionStore,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: SessionStore::new(SessionStore::default_path()),
        }
    }

    #[cfg(test)]
    fn with_store(config: Config, store: SessionStore) -> Self {
        Self { config, store }
    }

    /// Produce a live session, optionally navigated to `url`.
    ///
    /// Reuses the persisted browser when reachable; otherwise discards the
    /// stale handle, launches a fresh browser and persists its handle before
    /// returning. Repeated calls against an open browser act on the same
    /// first page rather than opening new tabs.
    pub async fn ensure_session(&self, url: Option<&str>) -> Result<Session> {
        let browser = match self.reattach().await {
            Some(browser) => browser,
            None => self.launch().await?,
        };

        let page = self.ensure_page(&browser).await?;

        if let Some(url) = url {
            self.navigate(&page, url).await?;
        }

        Ok(Session { browser, page })
    }

    /// Attempt to reattach to the persisted browser. Every failure mode is
    /// recovered by clearing the handle and reporting "no session".
    async fn reattach(&self) -> Option<Browser> {
        let mut handle = self.store.load()?;

        if !self.is_alive(handle.cdp_port).await {
            tracing::debug!(port = handle.cdp_port, "stored session unreachable, discarding");
            let _ = self.store.clear();
            return None;
        }

        // The browser may have restarted on the same port, which mints a new
        // WebSocket URL and invalidates the cached one.
        if let Some(fresh) = self.fetch_ws_url(handle.cdp_port).await {
            if fresh != handle.cdp_url {
                tracing::debug!("CDP WebSocket URL changed, updating handle");
                handle.cdp_url = fresh;
                if let Err(e) = self.store.save(&handle) {
                    tracing::debug!("failed to refresh session handle: {e}");
                }
            }
        }

        match Browser::connect(&handle.cdp_url).await {
            Ok((browser, handler)) => {
                spawn_handler(handler);
                tracing::debug!("reattached to browser at {}", handle.cdp_url);
                Some(browser)
            }
            Err(e) => {
                tracing::debug!("reattachment failed, discarding handle: {e}");
                let _ = self.store.clear();
                None
            }
        }
    }

    /// Launch a fresh browser and persist its handle so the next invocation
    /// can reattach, even when this one only opened a page.
    async fn launch(&self) -> Result<Browser> {
        let launcher = BrowserLauncher::from_config(&self.config)?;
        let (child, cdp_url) = launcher.launch_and_wait().await?;

        let handle = SessionHandle {
            cdp_port: launcher.cdp_port(),
            cdp_url: cdp_url.clone(),
            pid: Some(child.id()),
        };
        self.store.save(&handle)?;
        tracing::debug!("session handle persisted to {}", self.store.path().display());

        let (browser, handler) = Browser::connect(&cdp_url).await.map_err(|e| {
            WebpilotError::CdpConnectionFailed(format!(
                "Failed to connect to launched browser: {e}"
            ))
        })?;
        spawn_handler(handler);

        Ok(browser)
    }

    /// Reuse the browser's first open page, or create a blank one carrying
    /// the configured context defaults. An attached Chromium always exposes
    /// its default browsing context through the page list.
    async fn ensure_page(&self, browser: &Browser) -> Result<Page> {
        let pages = browser.pages().await?;
        if let Some(page) = pages.into_iter().next() {
            return Ok(page);
        }

        let page = browser.new_page("about:blank").await?;
        self.apply_context_defaults(&page).await?;
        Ok(page)
    }

    async fn apply_context_defaults(&self, page: &Page) -> Result<()> {
        let ctx = &self.config.context;

        page.execute(
            SetDeviceMetricsOverrideParams::builder()
                .width(ctx.viewport_width as i64)
                .height(ctx.viewport_height as i64)
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .unwrap(),
        )
        .await?;

        page.execute(
            SetTimezoneOverrideParams::builder()
                .timezone_id(ctx.timezone.clone())
                .build()
                .unwrap(),
        )
        .await?;

        page.execute(
            SetLocaleOverrideParams::builder()
                .locale(ctx.locale.clone())
                .build(),
        )
        .await?;

        Ok(())
    }

    /// Navigate and wait for the DOM-content-loaded milestone, bounded by a
    /// 30 second budget shared between the navigation and the readiness poll.
    async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        let start = std::time::Instant::now();

        match timeout(NAVIGATION_TIMEOUT, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(WebpilotError::NavigationFailed(format!("{url}: {e}")));
            }
            Err(_) => {
                return Err(WebpilotError::Timeout(format!(
                    "Navigation to {url} timed out after 30s"
                )));
            }
        }

        let remaining = NAVIGATION_TIMEOUT.saturating_sub(start.elapsed());
        self.wait_for_dom_content_loaded(page, remaining).await
    }

    async fn wait_for_dom_content_loaded(&self, page: &Page, limit: Duration) -> Result<()> {
        let start = std::time::Instant::now();

        loop {
            let ready_state = page
                .evaluate("document.readyState")
                .await?
                .into_value::<String>()
                .unwrap_or_default();

            if ready_state == "interactive" || ready_state == "complete" {
                return Ok(());
            }

            if start.elapsed() > limit {
                return Err(WebpilotError::Timeout(
                    "Page did not reach DOMContentLoaded in time".to_string(),
                ));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Probe the CDP HTTP endpoint for liveness
    async fn is_alive(&self, cdp_port: u16) -> bool {
        let url = format!("http://127.0.0.1:{cdp_port}/json/version");
        http_client(PROBE_TIMEOUT).get(&url).send().await.is_ok()
    }

    /// Fetch the current browser WebSocket URL from a CDP port.
    /// Returns `None` if the port is unreachable or the response is malformed.
    async fn fetch_ws_url(&self, cdp_port: u16) -> Option<String> {
        let url = format!("http://127.0.0.1:{cdp_port}/json/version");
        let resp = http_client(PROBE_TIMEOUT).get(&url).send().await.ok()?;
        let info: serde_json::Value = resp.json().await.ok()?;
        info.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// List open pages via the CDP HTTP endpoint, filtered to actual pages
    /// (not extensions or service workers).
    async fn fetch_pages(&self, cdp_port: u16) -> Result<Vec<PageInfo>> {
        let url = format!("http://127.0.0.1:{cdp_port}/json/list");

        let response = http_client(PROBE_TIMEOUT).get(&url).send().await.map_err(|e| {
            WebpilotError::CdpConnectionFailed(format!("Failed to list pages: {e}"))
        })?;

        let pages: Vec<PageInfo> = response.json().await.map_err(|e| {
            WebpilotError::CdpConnectionFailed(format!("Failed to parse page list: {e}"))
        })?;

        Ok(pages.into_iter().filter(|p| p.page_type == "page").collect())
    }

    /// Report reachability of the persisted session without launching
    /// anything.
    pub async fn status(&self) -> SessionStatus {
        let Some(handle) = self.store.load() else {
            return SessionStatus::NotRunning;
        };

        if !self.is_alive(handle.cdp_port).await {
            return SessionStatus::Stale;
        }

        let pages = self.fetch_pages(handle.cdp_port).await.unwrap_or_default();
        SessionStatus::Running { handle, pages }
    }

    /// Close the persisted browser if reachable and clear the handle either
    /// way. Returns whether a browser was actually closed.
    pub async fn close_session(&self) -> Result<bool> {
        let Some(handle) = self.store.load() else {
            return Ok(false);
        };

        let mut closed = false;
        if self.is_alive(handle.cdp_port).await {
            if let Ok((mut browser, handler)) = Browser::connect(&handle.cdp_url).await {
                spawn_handler(handler);
                let _ = browser.close().await;
                closed = true;
            }
        }

        self.store.clear()?;
        Ok(closed)
    }
}

/// Drive the chromiumoxide event loop for the lifetime of the invocation
fn spawn_handler(mut handler: Handler) {
    tokio::spawn(async move { while handler.next().await.is_some() {} });
}
