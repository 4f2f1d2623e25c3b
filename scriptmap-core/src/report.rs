// Listings and exports over the script repository

use crate::data::{Database, PageScript, ScriptGroup};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_EXPORT_PATH: &str = "scripts.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to read scripts: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Console listing of every script with the pages that reference it.
pub fn format_grouped_listing(groups: &[ScriptGroup]) -> String {
    let mut listing = String::from("Listing all scripts:\n");
    for (i, group) in groups.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {}\n   Sources: {}\n\n",
            i + 1,
            group.script_url,
            group.page_urls.join(", ")
        ));
    }
    listing
}

/// Console listing of the scripts recorded for one page.
pub fn format_page_listing(page_url: &str, scripts: &[PageScript]) -> String {
    let mut listing = format!("Listing all scripts from {}:\n", page_url);
    for (i, script) in scripts.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {} - ID: {}\n",
            i + 1,
            script.script_url,
            script.id
        ));
    }
    listing
}

/// Plain export: one numbered entry per script followed by its sources.
pub fn generate_text_report(groups: &[ScriptGroup]) -> String {
    let mut report = String::new();
    for (i, group) in groups.iter().enumerate() {
        report.push_str(&format!(
            "{}. {}\nSources: {}\n",
            i + 1,
            group.script_url,
            group.page_urls.join(",")
        ));
    }
    report
}

pub fn generate_json_report(groups: &[ScriptGroup]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(groups)
}

pub fn generate_markdown_report(groups: &[ScriptGroup]) -> String {
    let mut report = String::from("# Scripts\n\n");
    report.push_str(&format!("**Distinct scripts:** {}\n\n", groups.len()));

    for group in groups {
        report.push_str(&format!("## `{}`\n\n", group.script_url));
        for (id, page) in group.ids.iter().zip(&group.page_urls) {
            report.push_str(&format!("- {} (#{})\n", page, id));
        }
        report.push('\n');
    }
    report
}

pub fn generate_report(groups: &[ScriptGroup], format: ReportFormat) -> Result<String, ReportError> {
    Ok(match format {
        ReportFormat::Text => generate_text_report(groups),
        ReportFormat::Json => generate_json_report(groups)?,
        ReportFormat::Markdown => generate_markdown_report(groups),
    })
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Reads the grouped listing from `db` and writes it to `path`.
/// Returns the number of distinct scripts written.
pub fn export_scripts(db: &Database, path: &Path, format: ReportFormat) -> Result<usize, ReportError> {
    let groups = db.scripts_grouped()?;
    let content = generate_report(&groups, format)?;
    save_report(&content, path)?;
    Ok(groups.len())
}
