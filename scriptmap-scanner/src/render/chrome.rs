use crate::error::{Result, ScanError};
use crate::fetcher::{PageRenderer, render_blocking};
use crate::result::RenderedPage;
use anyhow::{Context, anyhow};
use headless_chrome::{Browser, LaunchOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const EXTRACT_JS: &str = r#"
    JSON.stringify({
        scriptSources: Array.from(document.querySelectorAll("script[src]"))
            .map((s) => s.src)
            .filter((src) => src),
        anchorHrefs: Array.from(document.querySelectorAll("a"))
            .map((a) => a.href)
            .filter((href) => href)
    })
"#;

/// Renders each page in a freshly launched headless Chromium, so scripts
/// injected at runtime are seen.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    timeout: Duration,
    settle: Duration,
}

impl ChromeRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            // Extra wait after navigation so late network activity can finish
            settle: Duration::from_millis(500),
        }
    }

    /// Synchronous render (runs in a blocking thread)
    fn render_sync(
        url: &str,
        timeout: Duration,
        settle: Duration,
        cancel: &AtomicBool,
    ) -> anyhow::Result<RenderedPage> {
        let browser = Browser::new(
            LaunchOptions::default_builder()
                .headless(true)
                .idle_browser_timeout(timeout)
                .build()
                .map_err(|e| anyhow!("Browser launch options error: {}", e))?,
        )
        .context("Failed to launch Chrome/Chromium")?;

        let tab = browser.new_tab().context("Failed to create new tab")?;
        tab.set_default_timeout(timeout);

        let cancelled = || cancel.load(Ordering::SeqCst);
        let extracted = (|| -> anyhow::Result<RenderedPage> {
            if cancelled() {
                return Err(anyhow!("render cancelled during browser launch"));
            }
            tab.navigate_to(url).context("Failed to navigate to URL")?;
            tab.wait_until_navigated().context("Navigation timeout")?;
            if cancelled() {
                return Err(anyhow!("render cancelled after navigation"));
            }
            std::thread::sleep(settle);
            if cancelled() {
                return Err(anyhow!("render cancelled before DOM query"));
            }

            let result = tab
                .evaluate(EXTRACT_JS, false)
                .context("Failed to query the rendered DOM")?;
            match result.value {
                Some(serde_json::Value::String(json)) => {
                    serde_json::from_str(&json).context("Unexpected DOM query result")
                }
                other => Err(anyhow!("DOM query returned {:?}", other)),
            }
        })();

        if let Err(e) = tab.close(true) {
            warn!("[Headless] Failed to close tab for {}: {}", url, e);
        }
        // Dropping the browser handle terminates the Chromium process
        drop(browser);

        extracted
    }
}

impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        info!("[Headless] Launching browser for: {}", url);

        let url_owned = url.to_string();
        let timeout = self.timeout;
        let settle = self.settle;

        // Chromium is closed before this returns, including on timeout
        let page = render_blocking(url, timeout, move |cancel: Arc<AtomicBool>| {
            Self::render_sync(&url_owned, timeout, settle, &cancel)
                .map_err(|e| ScanError::render(&url_owned, format!("{:#}", e)))
        })
        .await?;

        debug!(
            "[Headless] {} scripts and {} links on {}",
            page.script_sources.len(),
            page.anchor_hrefs.len(),
            url
        );
        Ok(page)
    }

    /// Navigation and its wait are each bounded by the tab timeout; after
    /// either, the cancel flag is honoured and the browser torn down.
    fn release_grace(&self) -> Duration {
        self.timeout * 2 + self.settle + Duration::from_secs(5)
    }
}
