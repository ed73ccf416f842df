//! Maps a browser URL back to the page model that owns it.
//!
//! Page URLs are either literal (`https://app/login`), regular expressions
//! (`regex:^https://app/orders/\d+$`) or wildcards (`https://app/*/edit`).
//! Lookup tries exact, then regex, then wildcard, then longest literal prefix.

use regex::Regex;
use tracing::warn;

use intentdb_core::types::PageSummary;

pub const REGEX_PREFIX: &str = "regex:";

#[derive(Debug, Clone)]
enum Pattern {
    Literal(String),
    Regex(Regex),
    Wildcard(Regex),
}

#[derive(Debug, Clone, Default)]
pub struct UrlMatcher {
    entries: Vec<(PageSummary, Pattern)>,
}

fn trim_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

impl UrlMatcher {
    /// Compiles the URL of every page. Pages without a URL, or with a pattern
    /// that fails to compile, are skipped.
    pub fn new<'a>(pages: impl IntoIterator<Item = &'a PageSummary>) -> Self {
        let mut entries = Vec::new();
        for page in pages {
            let url = page.url.trim();
            if url.is_empty() {
                continue;
            }
            let pattern = if let Some(expr) = url.strip_prefix(REGEX_PREFIX) {
                Regex::new(expr).map(Pattern::Regex)
            } else if url.contains('*') {
                wildcard_regex(url).map(Pattern::Wildcard)
            } else {
                Ok(Pattern::Literal(trim_url(url).to_string()))
            };
            match pattern {
                Ok(pattern) => entries.push((page.clone(), pattern)),
                Err(e) => warn!(page = %page.name, url, error = %e, "skipping unparseable page url pattern"),
            }
        }
        Self { entries }
    }

    pub fn find(&self, url: &str) -> Option<&PageSummary> {
        let target = trim_url(url);
        if target.is_empty() {
            return None;
        }

        let exact = self.entries.iter().find(|(_, p)| matches!(p, Pattern::Literal(l) if l == target));
        if let Some((page, _)) = exact {
            return Some(page);
        }

        let regex = self.entries.iter().find(|(_, p)| matches!(p, Pattern::Regex(re) if re.is_match(url.trim())));
        if let Some((page, _)) = regex {
            return Some(page);
        }

        let wildcard = self
            .entries
            .iter()
            .find(|(_, p)| matches!(p, Pattern::Wildcard(re) if re.is_match(target) || re.is_match(url.trim())));
        if let Some((page, _)) = wildcard {
            return Some(page);
        }

        self.entries
            .iter()
            .filter_map(|(page, p)| match p {
                Pattern::Literal(prefix) if is_path_prefix(prefix, target) => Some((prefix.len(), page)),
                _ => None,
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, page)| page)
    }
}

/// `prefix` is a prefix of `url` ending on a path, query or fragment boundary.
fn is_path_prefix(prefix: &str, url: &str) -> bool {
    match url.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(&['/', '?', '#'][..]),
        None => false,
    }
}
