use crate::error::Result;
use crate::fetcher::{PageFetcher, PageRenderer};
use crate::origin::{OriginFilter, OriginMatch};
use crate::result::{CrawlSummary, PageFailure, StoreFailure};
use crate::visited::{UrlIdentity, VisitedSet};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Called with `(depth, url)` each time a page is entered.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Receives every `(page, script)` pair as soon as it is discovered.
/// The crawl waits for each `record` to return before moving on.
pub trait ScriptSink {
    type Error: Display;

    fn record(&mut self, page_url: &str, script_url: &str) -> std::result::Result<i64, Self::Error>;
}

impl ScriptSink for Vec<(String, String)> {
    type Error = Infallible;

    fn record(&mut self, page_url: &str, script_url: &str) -> std::result::Result<i64, Infallible> {
        self.push((page_url.to_string(), script_url.to_string()));
        Ok(self.len() as i64)
    }
}

/// Order in which discovered links are explored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraversalOrder {
    /// A link's whole subtree is explored before its next sibling.
    #[default]
    DepthFirst,
    /// All pages at depth `n` are explored before any at depth `n + 1`.
    BreadthFirst,
}

pub struct Crawler<R> {
    fetcher: PageFetcher<R>,
    max_depth: usize,
    order: TraversalOrder,
    identity: UrlIdentity,
    origin_match: OriginMatch,
    progress_callback: Option<ProgressCallback>,
}

impl<R: PageRenderer> Crawler<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            fetcher: PageFetcher::new(renderer),
            max_depth: DEFAULT_MAX_DEPTH,
            order: TraversalOrder::default(),
            identity: UrlIdentity::default(),
            origin_match: OriginMatch::default(),
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher = self.fetcher.with_timeout(timeout);
        self
    }

    pub fn with_order(mut self, order: TraversalOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_url_identity(mut self, identity: UrlIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_origin_match(mut self, origin_match: OriginMatch) -> Self {
        self.origin_match = origin_match;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Runs one session from `start_url`, handing every script reference to
    /// `sink`. Only an unusable start URL fails the session; page and sink
    /// failures are collected in the summary.
    pub async fn crawl<S: ScriptSink>(&self, start_url: &str, sink: &mut S) -> Result<CrawlSummary> {
        let filter = OriginFilter::new(start_url, self.origin_match)?;
        info!(
            "Starting crawl of {} (origin {}, max depth {}, render timeout {:?})",
            start_url,
            filter.origin(),
            self.max_depth,
            self.fetcher.timeout()
        );

        let mut summary = CrawlSummary::new(start_url.to_string(), filter.origin().to_string());
        let mut visited = VisitedSet::new(self.identity);
        let mut pending: VecDeque<(String, usize)> = VecDeque::new();
        pending.push_back((start_url.to_string(), 0));

        while let Some((url, depth)) = pending.pop_front() {
            if depth > self.max_depth || !visited.check_and_mark(&url) {
                continue;
            }

            if let Some(ref callback) = self.progress_callback {
                callback(depth, url.clone());
            }
            summary.pages_visited.push(url.clone());

            let page = match self.fetcher.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Crawl error for {}: {}", url, e);
                    summary.failures.push(PageFailure {
                        url,
                        depth,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for script_url in &page.script_sources {
                match sink.record(&url, script_url) {
                    Ok(id) => {
                        debug!("Recorded script {} on {} as #{}", script_url, url, id);
                        summary.scripts_recorded += 1;
                    }
                    Err(e) => {
                        warn!("Failed to record script {} on {}: {}", script_url, url, e);
                        summary.store_errors.push(StoreFailure {
                            page_url: url.clone(),
                            script_url: script_url.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            let mut links = Vec::new();
            for link in page.anchor_hrefs {
                if filter.admits(&link) {
                    links.push(link);
                } else {
                    debug!("  -> {} is outside {}, skipping", link, filter.origin());
                    summary.links_skipped += 1;
                }
            }
            self.schedule(&mut pending, links, depth + 1);
        }

        info!(
            "Crawl complete. Visited {} pages, recorded {} scripts",
            summary.pages_visited.len(),
            summary.scripts_recorded
        );
        Ok(summary)
    }

    fn schedule(&self, pending: &mut VecDeque<(String, usize)>, links: Vec<String>, depth: usize) {
        if depth > self.max_depth {
            return;
        }
        match self.order {
            // Front of the queue in reverse, so the first link is explored first
            TraversalOrder::DepthFirst => {
                for link in links.into_iter().rev() {
                    pending.push_front((link, depth));
                }
            }
            TraversalOrder::BreadthFirst => {
                pending.extend(links.into_iter().map(|link| (link, depth)));
            }
        }
    }
}
