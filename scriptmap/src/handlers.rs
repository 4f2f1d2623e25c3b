use clap::ArgMatches;
use colored::Colorize;
use scriptmap_core::crawl::{CrawlOptions, execute_crawl, generate_crawl_report};
use scriptmap_core::data::{Database, StoreError};
use scriptmap_core::report::{
    ReportError, ReportFormat, export_scripts, format_grouped_listing, format_page_listing,
};
use scriptmap_scanner::render::HttpRenderer;
use scriptmap_scanner::{
    CrawlSummary, OriginMatch, PageRenderer, ScanError, TraversalOrder, UrlIdentity, origin_of,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Render engine unavailable: {0}")]
    Engine(String),

    #[error("Crawl finished with {0} failed page(s)")]
    CrawlIncomplete(usize),

    #[error("Crawl finished but {0} script reference(s) could not be stored")]
    StoreIncomplete(usize),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Crawl error: {0}")]
    Scan(ScanError),

    #[error("{0}")]
    Report(#[from] ReportError),

    #[error("Database file error: {0}")]
    StoreFile(#[from] std::io::Error),
}

impl CliError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => 2,
            CliError::InvalidUrl(_) => 3,
            CliError::Engine(_) | CliError::CrawlIncomplete(_) | CliError::Scan(_) => 4,
            CliError::Store(_) | CliError::StoreIncomplete(_) | CliError::StoreFile(_) => 5,
            CliError::Report(ReportError::Store(_)) => 5,
            CliError::Report(_) => 6,
        }
    }
}

impl From<ScanError> for CliError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::InvalidUrl(msg) => CliError::InvalidUrl(msg),
            other => CliError::Scan(other),
        }
    }
}

/// Install the stderr log subscriber. Only `level` decides verbosity; the
/// environment is not consulted.
pub fn init_tracing(level: &str) {
    let directives = format!(
        "warn,scriptmap={0},scriptmap_core={0},scriptmap_scanner={0}",
        level
    );
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Resolve `~` in the database location
pub fn expand_database_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    debug!("Opening script database at {}", path.display());
    Ok(Database::new(path)?)
}

/// Validate a start URL, keeping the caller's exact spelling.
pub fn parse_start_url(raw: &str) -> Result<String, CliError> {
    origin_of(raw)?;
    Ok(raw.to_string())
}

/// Build crawl options from the top-level arguments
pub fn crawl_options_from_args(url: &str, args: &ArgMatches) -> Result<CrawlOptions, CliError> {
    let mut options = CrawlOptions::new(parse_start_url(url)?);
    options.max_depth = args.get_one::<usize>("depth").copied().unwrap_or(options.max_depth);
    options.timeout = args
        .get_one::<u64>("timeout")
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or(options.timeout);
    if args.get_flag("breadth-first") {
        options.order = TraversalOrder::BreadthFirst;
    }
    if args.get_flag("prefix-origin") {
        options.origin_match = OriginMatch::Prefix;
    }
    if args.get_flag("ignore-fragments") {
        options.identity = UrlIdentity::IgnoreFragment;
    }
    options.show_progress_bars = !args.get_flag("quiet");
    Ok(options)
}

pub async fn handle_crawl(db: &mut Database, url: &str, args: &ArgMatches) -> Result<CrawlSummary, CliError> {
    let options = crawl_options_from_args(url, args)?;
    let engine = args.get_one::<String>("engine").map(String::as_str).unwrap_or("http");

    println!("\n{} {}", "Crawling".bright_cyan().bold(), options.url);
    println!("Max depth: {}", options.max_depth);
    println!("Render timeout: {}s\n", options.timeout.as_secs());

    match engine {
        "http" => {
            let renderer = HttpRenderer::with_timeout(options.timeout.as_secs())
                .map_err(|e| CliError::Engine(e.to_string()))?;
            run_crawl(db, renderer, options).await
        }
        "chrome" => crawl_with_chrome(db, options).await,
        other => Err(CliError::Usage(format!("unknown engine '{}'", other))),
    }
}

#[cfg(feature = "headless")]
async fn crawl_with_chrome(db: &mut Database, options: CrawlOptions) -> Result<CrawlSummary, CliError> {
    let renderer = scriptmap_scanner::render::ChromeRenderer::new(options.timeout);
    run_crawl(db, renderer, options).await
}

#[cfg(not(feature = "headless"))]
async fn crawl_with_chrome(_db: &mut Database, _options: CrawlOptions) -> Result<CrawlSummary, CliError> {
    Err(CliError::Engine(
        "this build has no headless Chrome support; rebuild with `--features headless`".to_string(),
    ))
}

async fn run_crawl<R: PageRenderer>(
    db: &mut Database,
    renderer: R,
    options: CrawlOptions,
) -> Result<CrawlSummary, CliError> {
    let verbose = options.show_progress_bars;
    let progress = verbose.then(|| {
        Arc::new(|msg: String| {
            if msg.starts_with("Crawl complete") {
                eprintln!("{} {}", "✓".green().bold(), msg);
            }
        }) as scriptmap_core::crawl::CrawlProgressCallback
    });

    let summary = execute_crawl(db, renderer, options, progress).await?;

    print!("{}", generate_crawl_report(&summary));
    Ok(summary)
}

/// Map a finished session to the command outcome
pub fn summary_status(summary: &CrawlSummary) -> Result<(), CliError> {
    if !summary.store_errors.is_empty() {
        return Err(CliError::StoreIncomplete(summary.store_errors.len()));
    }
    if !summary.failures.is_empty() {
        return Err(CliError::CrawlIncomplete(summary.failures.len()));
    }
    Ok(())
}

pub fn handle_list(db: &Database, page_url: Option<&str>) -> Result<String, CliError> {
    match page_url {
        Some(url) => {
            let scripts = db.scripts_by_page(url)?;
            Ok(format_page_listing(url, &scripts))
        }
        None => {
            let groups = db.scripts_grouped()?;
            Ok(format_grouped_listing(&groups))
        }
    }
}

pub fn handle_save(db: &Database, path: &Path, format: &str) -> Result<usize, CliError> {
    let format = ReportFormat::from_str(format)
        .ok_or_else(|| CliError::Usage(format!("unknown format '{}'", format)))?;
    Ok(export_scripts(db, path, format)?)
}

pub fn handle_empty(db: &Database) -> Result<usize, CliError> {
    Ok(db.delete_all()?)
}

/// Removes the database file. Returns false when there was nothing to remove.
pub fn handle_purge(path: &Path) -> Result<bool, CliError> {
    if !Database::exists(path) {
        return Ok(false);
    }
    Database::drop(path)?;
    Ok(true)
}
