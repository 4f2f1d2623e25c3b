//! Same-origin boundary for a crawl session.

use crate::error::{Result, ScanError};
use url::{Origin, Url};

/// How discovered links are tested against the session origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OriginMatch {
    /// Plain string-prefix test. Admits hosts that merely extend the origin
    /// string, e.g. `https://a.test.evil.com` for `https://a.test`.
    Prefix,
    /// String prefix plus an exact parsed-origin comparison.
    #[default]
    Strict,
}

/// Scheme, host and port of `url`, serialized without path or query.
pub fn origin_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.origin() {
        origin @ Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        Origin::Opaque(_) => Err(ScanError::InvalidUrl(format!(
            "{} has no network origin",
            url
        ))),
    }
}

/// The link filter for one session, fixed to the start URL's origin.
#[derive(Debug, Clone)]
pub struct OriginFilter {
    origin: String,
    mode: OriginMatch,
}

impl OriginFilter {
    pub fn new(start_url: &str, mode: OriginMatch) -> Result<Self> {
        Ok(Self {
            origin: origin_of(start_url)?,
            mode,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn admits(&self, link: &str) -> bool {
        if !link.starts_with(&self.origin) {
            return false;
        }
        match self.mode {
            OriginMatch::Prefix => true,
            OriginMatch::Strict => origin_of(link)
                .map(|origin| origin == self.origin)
                .unwrap_or(false),
        }
    }
}
