//! Chrome DevTools Protocol session. Either launches a headless browser or
//! attaches to one already running with a debug port, then exposes the page
//! through the session traits the capture pipeline drives.
//!
//! The protocol client is blocking, so every call is pushed onto the
//! blocking pool instead of stalling the runtime.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::PageError;
use crate::page::{PageSession, ViewCamera};

/// One live page in a browser we either own or borrowed. Dropping the
/// session shuts a launched browser down with its child process; an attached
/// browser only loses the connection and keeps running.
pub struct CdpSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl CdpSession {
    /// Launches a headless browser and opens `url` in a fresh tab.
    pub async fn launch(url: &str) -> anyhow::Result<Self> {
        let url = url.to_string();
        let (browser, tab) =
            tokio::task::spawn_blocking(move || -> anyhow::Result<(Browser, Arc<Tab>)> {
                let options = LaunchOptions::default_builder()
                    .headless(true)
                    .build()
                    .map_err(|e| anyhow::anyhow!("browser launch options: {e}"))?;
                let browser = Browser::new(options).context("launch browser")?;
                let tab = open_tab(&browser, &url)?;
                Ok((browser, tab))
            })
            .await
            .context("browser launch task")??;
        tracing::info!("launched headless browser");
        Ok(CdpSession {
            _browser: browser,
            tab,
        })
    }

    /// Attaches to a browser that is already running with remote debugging
    /// enabled. `endpoint` is either the websocket debugger URL or the HTTP
    /// endpoint (`http://localhost:9222`) it can be resolved from.
    pub async fn attach(endpoint: &str, url: &str) -> anyhow::Result<Self> {
        let ws_url = resolve_ws_url(endpoint).await?;
        let url = url.to_string();
        let (browser, tab) =
            tokio::task::spawn_blocking(move || -> anyhow::Result<(Browser, Arc<Tab>)> {
                let browser = Browser::connect(ws_url).context("connect to browser")?;
                let tab = open_tab(&browser, &url)?;
                Ok((browser, tab))
            })
            .await
            .context("browser attach task")??;
        tracing::info!(endpoint, "attached to running browser");
        Ok(CdpSession {
            _browser: browser,
            tab,
        })
    }
}

fn open_tab(browser: &Browser, url: &str) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab().context("open tab")?;
    tab.navigate_to(url).context("navigate")?;
    tab.wait_until_navigated().context("wait for page load")?;
    Ok(tab)
}

/// Resolves an HTTP debug endpoint to its websocket debugger URL. Websocket
/// URLs pass through untouched.
async fn resolve_ws_url(endpoint: &str) -> anyhow::Result<String> {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Ok(endpoint.to_string());
    }
    let version_url = format!("{}/json/version", endpoint.trim_end_matches('/'));
    let body: serde_json::Value = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .with_context(|| format!("query {version_url}"))?
        .json()
        .await
        .context("parse /json/version response")?;
    body["webSocketDebuggerUrl"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("no webSocketDebuggerUrl at {version_url}"))
}

async fn blocking<T, F>(f: F) -> Result<T, PageError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PageError::Driver(e.to_string()))?
        .map_err(|e| PageError::Driver(e.to_string()))
}

#[async_trait]
impl PageSession for CdpSession {
    async fn url(&self) -> Result<String, PageError> {
        Ok(self.tab.get_url())
    }

    async fn content(&self) -> Result<String, PageError> {
        let tab = self.tab.clone();
        blocking(move || tab.get_content()).await
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        let tab = self.tab.clone();
        let selector = selector.to_string();
        blocking(move || Ok(tab.find_element(&selector).is_ok())).await
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let tab = self.tab.clone();
        let selector = selector.to_string();
        blocking(move || {
            tab.find_element(&selector)?.click()?;
            Ok(())
        })
        .await
    }

    async fn press_escape(&self) -> Result<(), PageError> {
        let tab = self.tab.clone();
        blocking(move || {
            tab.press_key("Escape")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ViewCamera for CdpSession {
    async fn capture_png(&self) -> Result<Vec<u8>, PageError> {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        })
        .await
        .map_err(|e| PageError::Screenshot(e.to_string()))?
        .map_err(|e| PageError::Screenshot(e.to_string()))
    }
}
