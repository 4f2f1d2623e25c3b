use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Render failed for {url}: {reason}")]
    RenderFailure { url: String, reason: String },

    #[error("Render of {url} did not settle within {timeout:?}")]
    RenderTimeout { url: String, timeout: Duration },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl ScanError {
    pub fn render(url: &str, reason: impl ToString) -> Self {
        ScanError::RenderFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
