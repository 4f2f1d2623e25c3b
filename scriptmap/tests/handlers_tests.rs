use scriptmap::commands::command_argument_builder;
use scriptmap::handlers::*;
use scriptmap_core::data::Database;
use scriptmap_scanner::result::{PageFailure, StoreFailure};
use scriptmap_scanner::{CrawlSummary, OriginMatch, TraversalOrder, UrlIdentity};
use std::time::Duration;
use tempfile::TempDir;

fn seeded_database(dir: &TempDir) -> Database {
    let db = Database::new(&dir.path().join("jsdatabase.db")).unwrap();
    db.insert_script("https://a.test/", "https://cdn.test/x.js").unwrap();
    db.insert_script("https://a.test/b", "https://cdn.test/y.js").unwrap();
    db.insert_script("https://a.test/b", "https://cdn.test/x.js").unwrap();
    db
}

fn clean_summary() -> CrawlSummary {
    CrawlSummary::new("https://a.test/".to_string(), "https://a.test".to_string())
}

// ============================================================================
// Argument Tests
// ============================================================================

#[test]
fn test_parse_start_url_keeps_spelling() {
    let url = parse_start_url("https://A.test/path?q=1#top").unwrap();
    assert_eq!(url, "https://A.test/path?q=1#top");
}

#[test]
fn test_parse_start_url_invalid() {
    let err = parse_start_url("not a url").unwrap_err();
    assert!(matches!(err, CliError::InvalidUrl(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_crawl_options_defaults() {
    let matches = command_argument_builder()
        .try_get_matches_from(["scriptmap", "https://a.test/"])
        .unwrap();
    let options = crawl_options_from_args("https://a.test/", &matches).unwrap();

    assert_eq!(options.url, "https://a.test/");
    assert_eq!(options.max_depth, 2);
    assert_eq!(options.timeout, Duration::from_secs(30));
    assert_eq!(options.order, TraversalOrder::DepthFirst);
    assert_eq!(options.identity, UrlIdentity::Exact);
    assert_eq!(options.origin_match, OriginMatch::Strict);
    assert!(options.show_progress_bars);
}

#[test]
fn test_crawl_options_from_flags() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "scriptmap",
            "--depth",
            "4",
            "--timeout",
            "5",
            "--breadth-first",
            "--prefix-origin",
            "--ignore-fragments",
            "-q",
            "https://a.test/",
        ])
        .unwrap();
    let options = crawl_options_from_args("https://a.test/", &matches).unwrap();

    assert_eq!(options.max_depth, 4);
    assert_eq!(options.timeout, Duration::from_secs(5));
    assert_eq!(options.order, TraversalOrder::BreadthFirst);
    assert_eq!(options.identity, UrlIdentity::IgnoreFragment);
    assert_eq!(options.origin_match, OriginMatch::Prefix);
    assert!(!options.show_progress_bars);
}

#[test]
fn test_zero_timeout_rejected() {
    let result = command_argument_builder().try_get_matches_from(["scriptmap", "--timeout", "0", "https://a.test/"]);
    assert!(result.is_err());
}

#[test]
fn test_global_database_flag_reaches_subcommand() {
    let matches = command_argument_builder()
        .try_get_matches_from(["scriptmap", "--database", "other.db", "list"])
        .unwrap();
    let (name, sub) = matches.subcommand().unwrap();

    assert_eq!(name, "list");
    assert_eq!(sub.get_one::<String>("database").unwrap(), "other.db");
}

#[test]
fn test_expand_database_path_plain() {
    assert_eq!(
        expand_database_path("jsdatabase.db"),
        std::path::PathBuf::from("jsdatabase.db")
    );
}

// ============================================================================
// Outcome Tests
// ============================================================================

#[test]
fn test_summary_status_clean() {
    assert!(summary_status(&clean_summary()).is_ok());
}

#[test]
fn test_summary_status_failed_pages() {
    let mut summary = clean_summary();
    summary.failures.push(PageFailure {
        url: "https://a.test/broken".to_string(),
        depth: 1,
        error: "Render timed out".to_string(),
    });

    let err = summary_status(&summary).unwrap_err();
    assert!(matches!(err, CliError::CrawlIncomplete(1)));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_summary_status_store_errors_take_precedence() {
    let mut summary = clean_summary();
    summary.failures.push(PageFailure {
        url: "https://a.test/broken".to_string(),
        depth: 1,
        error: "boom".to_string(),
    });
    summary.store_errors.push(StoreFailure {
        page_url: "https://a.test/".to_string(),
        script_url: "https://cdn.test/x.js".to_string(),
        error: "database is locked".to_string(),
    });

    let err = summary_status(&summary).unwrap_err();
    assert!(matches!(err, CliError::StoreIncomplete(1)));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn test_exit_codes() {
    assert_eq!(CliError::Usage("x".to_string()).exit_code(), 2);
    assert_eq!(CliError::Engine("x".to_string()).exit_code(), 4);
}

// ============================================================================
// Repository Command Tests
// ============================================================================

#[test]
fn test_handle_list_grouped() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir);

    let listing = handle_list(&db, None).unwrap();

    assert!(listing.starts_with("Listing all scripts:\n"));
    assert!(listing.contains("1. https://cdn.test/x.js\n   Sources: https://a.test/, https://a.test/b\n"));
    assert!(listing.contains("2. https://cdn.test/y.js\n   Sources: https://a.test/b\n"));
}

#[test]
fn test_handle_list_for_page() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir);

    let listing = handle_list(&db, Some("https://a.test/b")).unwrap();

    assert_eq!(
        listing,
        "Listing all scripts from https://a.test/b:\n\
         1. https://cdn.test/y.js - ID: 2\n\
         2. https://cdn.test/x.js - ID: 3\n"
    );
}

#[test]
fn test_handle_list_empty_database() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("empty.db")).unwrap();

    assert_eq!(handle_list(&db, None).unwrap(), "Listing all scripts:\n");
}

#[test]
fn test_handle_save_text() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir);
    let out = dir.path().join("scripts.txt");

    let groups = handle_save(&db, &out, "text").unwrap();
    let content = std::fs::read_to_string(&out).unwrap();

    assert_eq!(groups, 2);
    assert_eq!(
        content,
        "1. https://cdn.test/x.js\nSources: https://a.test/,https://a.test/b\n\
         2. https://cdn.test/y.js\nSources: https://a.test/b\n"
    );
}

#[test]
fn test_handle_save_unknown_format() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir);

    let err = handle_save(&db, &dir.path().join("out.pdf"), "pdf").unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_handle_save_unwritable_path() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir);
    let out = dir.path().join("missing").join("scripts.txt");

    let err = handle_save(&db, &out, "text").unwrap_err();
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn test_handle_empty() {
    let dir = TempDir::new().unwrap();
    let db = seeded_database(&dir);

    assert_eq!(handle_empty(&db).unwrap(), 3);
    assert_eq!(db.count().unwrap(), 0);
    assert_eq!(handle_list(&db, None).unwrap(), "Listing all scripts:\n");

    // Ids keep climbing after a wipe
    let id = db.insert_script("https://a.test/", "https://cdn.test/z.js").unwrap();
    assert_eq!(id, 4);
}

#[test]
fn test_handle_purge_removes_database_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jsdatabase.db");
    {
        let db = Database::new(&db_path).unwrap();
        db.insert_script("https://a.test/", "https://cdn.test/x.js").unwrap();
    }

    assert!(handle_purge(&db_path).unwrap());
    assert!(!Database::exists(&db_path));
    assert!(!dir.path().join("jsdatabase.db-wal").exists());
    assert!(!dir.path().join("jsdatabase.db-shm").exists());

    // A fresh store starts empty
    let db = Database::new(&db_path).unwrap();
    assert_eq!(db.count().unwrap(), 0);
}

#[test]
fn test_handle_purge_missing_database() {
    let dir = TempDir::new().unwrap();
    assert!(!handle_purge(&dir.path().join("absent.db")).unwrap());
}

#[test]
fn test_empty_purge_flag_parses() {
    let matches = command_argument_builder()
        .try_get_matches_from(["scriptmap", "empty", "--purge"])
        .unwrap();
    let (name, sub) = matches.subcommand().unwrap();

    assert_eq!(name, "empty");
    assert!(sub.get_flag("purge"));
}
