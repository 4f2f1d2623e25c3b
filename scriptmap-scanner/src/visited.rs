//! Per-session record of pages already entered.

use std::collections::HashSet;

/// Which URL strings count as the same page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UrlIdentity {
    /// Byte-for-byte string equality.
    #[default]
    Exact,
    /// Equality after dropping any `#fragment` suffix.
    IgnoreFragment,
}

impl UrlIdentity {
    fn key<'a>(&self, url: &'a str) -> &'a str {
        match self {
            UrlIdentity::Exact => url,
            UrlIdentity::IgnoreFragment => url.split_once('#').map_or(url, |(head, _)| head),
        }
    }
}

#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<String>,
    identity: UrlIdentity,
}

impl VisitedSet {
    pub fn new(identity: UrlIdentity) -> Self {
        Self {
            seen: HashSet::new(),
            identity,
        }
    }

    pub fn has(&self, url: &str) -> bool {
        self.seen.contains(self.identity.key(url))
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.seen.insert(self.identity.key(url).to_string());
    }

    /// Marks `url` and reports whether it was new.
    pub fn check_and_mark(&mut self, url: &str) -> bool {
        self.seen.insert(self.identity.key(url).to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
