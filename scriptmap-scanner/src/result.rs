use serde::{Deserialize, Serialize};

/// What a renderer extracted from one page: `script[src]` values and anchor
/// `href` values, both absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub script_sources: Vec<String>,
    pub anchor_hrefs: Vec<String>,
}

impl RenderedPage {
    pub fn new(script_sources: Vec<String>, anchor_hrefs: Vec<String>) -> Self {
        Self {
            script_sources,
            anchor_hrefs,
        }
    }
}

/// A page whose fetch failed during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub url: String,
    pub depth: usize,
    pub error: String,
}

/// A script reference that could not be written to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFailure {
    pub page_url: String,
    pub script_url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub start_url: String,
    pub origin: String,
    pub pages_visited: Vec<String>,
    pub scripts_recorded: usize,
    pub links_skipped: usize,
    pub failures: Vec<PageFailure>,
    pub store_errors: Vec<StoreFailure>,
}

impl CrawlSummary {
    pub fn new(start_url: String, origin: String) -> Self {
        Self {
            start_url,
            origin,
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.store_errors.is_empty()
    }
}
