use crate::error::{Result, ScanError};
use crate::fetcher::PageRenderer;
use crate::result::RenderedPage;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches raw HTML over HTTP and reads script and anchor attributes from it.
/// Scripts are never executed, so DOM nodes inserted at runtime are not seen.
#[derive(Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "scriptmap/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/trapdoorsec/scriptmap)"
            ))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {}", url, status);
        }

        // Relative references resolve against the post-redirect location
        let final_url = response.url().to_string();
        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(false);

        if !is_html {
            debug!("{} is not HTML, nothing to extract", url);
            return Ok(RenderedPage::default());
        }

        let body = response.text().await?;
        extract_elements(&body, &final_url)
    }
}

/// Reads `script[src]` and `a[href]` values out of `html`, resolved against
/// the document base URL the way a browser's `src`/`href` properties are.
/// The first `<base href>` wins, itself resolved against `page_url`.
pub fn extract_elements(html: &str, page_url: &str) -> Result<RenderedPage> {
    let page = Url::parse(page_url)
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", page_url, e)))?;
    let document = Html::parse_document(html);

    let base_selector =
        Selector::parse("base[href]").map_err(|e| ScanError::ParseError(e.to_string()))?;
    let base = document
        .select(&base_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page.join(href.trim()).ok())
        .unwrap_or(page);

    let script_selector =
        Selector::parse("script[src]").map_err(|e| ScanError::ParseError(e.to_string()))?;
    let link_selector =
        Selector::parse("a[href]").map_err(|e| ScanError::ParseError(e.to_string()))?;

    let script_sources: Vec<String> = document
        .select(&script_selector)
        .filter_map(|element| element.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .filter_map(|src| resolve(&base, src))
        .collect();

    let anchor_hrefs: Vec<String> = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve(&base, href))
        .collect();

    debug!(
        "Found {} scripts and {} links on {}",
        script_sources.len(),
        anchor_hrefs.len(),
        page_url
    );
    Ok(RenderedPage::new(script_sources, anchor_hrefs))
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    base.join(reference.trim()).ok().map(String::from)
}
