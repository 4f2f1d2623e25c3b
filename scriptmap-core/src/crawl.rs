use crate::data::Database;
use indicatif::{ProgressBar, ProgressStyle};
use scriptmap_scanner::crawler::{DEFAULT_MAX_DEPTH, ProgressCallback};
use scriptmap_scanner::fetcher::DEFAULT_RENDER_TIMEOUT;
use scriptmap_scanner::{
    CrawlSummary, Crawler, OriginMatch, PageRenderer, ScanError, TraversalOrder, UrlIdentity,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub max_depth: usize,
    pub timeout: Duration,
    pub order: TraversalOrder,
    pub identity: UrlIdentity,
    pub origin_match: OriginMatch,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: DEFAULT_RENDER_TIMEOUT,
            order: TraversalOrder::DepthFirst,
            identity: UrlIdentity::Exact,
            origin_match: OriginMatch::Strict,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Run one crawl session, storing every script reference in `db` as it is
/// found. Returns once the last insert has landed.
pub async fn execute_crawl<R: PageRenderer>(
    db: &mut Database,
    renderer: R,
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary, ScanError> {
    let CrawlOptions {
        url,
        max_depth,
        timeout,
        order,
        identity,
        origin_match,
        show_progress_bars,
    } = options;

    // Single spinner for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let pb_clone = progress_bar.clone();
    let count_clone = processed_count.clone();
    let user_callback = progress_callback.clone();
    let internal_progress_callback: ProgressCallback = Arc::new(move |depth: usize, page: String| {
        let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "Crawling... {} pages ({} at depth {})",
                count,
                extract_url_path(&page),
                depth
            ));
            pb.tick();
        }
        if let Some(ref callback) = user_callback {
            callback(format!("[depth {}] {}", depth, page));
        }
    });

    let crawler = Crawler::new(renderer)
        .with_max_depth(max_depth)
        .with_timeout(timeout)
        .with_order(order)
        .with_url_identity(identity)
        .with_origin_match(origin_match)
        .with_progress_callback(internal_progress_callback);

    let outcome = crawler.crawl(&url, db).await;
    if let Ok(ref summary) = outcome {
        info!(
            "Session for {} stored {} script references ({} failed pages)",
            url,
            summary.scripts_recorded,
            summary.failures.len()
        );
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_and_clear();
        if let Some(ref callback) = progress_callback {
            callback(format!("Crawl complete! {} pages processed", total));
        }
    }

    outcome
}

/// Generate a crawl report from a session summary
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Start URL: {}\n", summary.start_url));
    report.push_str(&format!("  Origin: {}\n", summary.origin));
    report.push_str(&format!("  Pages crawled: {}\n", summary.pages_visited.len()));
    report.push_str(&format!("  Scripts recorded: {}\n", summary.scripts_recorded));
    report.push_str(&format!(
        "  Off-origin links skipped: {}\n",
        summary.links_skipped
    ));

    if !summary.failures.is_empty() {
        report.push_str(&format!("\n## Failed pages ({})\n", summary.failures.len()));
        for failure in &summary.failures {
            report.push_str(&format!(
                "  ✗ [depth {}] {}\n      {}\n",
                failure.depth, failure.url, failure.error
            ));
        }
    }

    if !summary.store_errors.is_empty() {
        report.push_str(&format!(
            "\n## Unsaved script references ({})\n",
            summary.store_errors.len()
        ));
        for failure in &summary.store_errors {
            report.push_str(&format!(
                "  ✗ {} on {}\n      {}\n",
                failure.script_url, failure.page_url, failure.error
            ));
        }
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}
