//! Per-source adapters.
//!
//! Each adapter builds one outbound request from its lookup key, executes it
//! through the injected [`RequestExecutor`](crate::RequestExecutor), decodes
//! the body, and maps it into a canonical [`Record`](bibresolve_shared::Record).
//! Transport errors, non-2xx statuses, malformed bodies and zero results all
//! surface as a single error; no adapter returns a partial record.

mod article;
mod bnb;
mod crossref;
mod google_books;
mod loc;
mod oclc;
mod openbd;
mod openlibrary;
mod video;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use bibresolve_shared::{BibError, Result, isbn};

pub use article::ArticleFetcher;
pub use bnb::Bnb;
pub use crossref::Crossref;
pub use google_books::GoogleBooks;
pub use loc::LibraryOfCongress;
pub use oclc::OclcClassify;
pub use openbd::OpenBd;
pub use openlibrary::OpenLibrary;
pub use video::VideoOembed;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Normalize an ISBN lookup key, rejecting blanks.
pub(crate) fn isbn_key(raw: &str) -> Result<String> {
    let key = isbn::normalize(raw);
    if key.is_empty() {
        return Err(BibError::invalid_key("ISBN is empty"));
    }
    Ok(key)
}

/// The key followed by its other ISBN form. A key whose check digit does not
/// recompute is returned alone.
pub(crate) fn isbn_forms(key: &str) -> Vec<String> {
    let mut forms = vec![key.to_string()];
    if isbn::is_valid(key) {
        let other = match key.len() {
            10 => isbn::to_isbn13(key),
            _ => isbn::to_isbn10(key),
        };
        forms.extend(other.filter(|o| o != key));
    }
    forms
}

/// Reject blank title keys; trims the author.
pub(crate) fn title_key<'a>(title: &'a str, author: &'a str) -> Result<(&'a str, &'a str)> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BibError::invalid_key("title is empty"));
    }
    Ok((title, author.trim()))
}

/// `base` + `path` with URL-encoded query parameters.
pub(crate) fn endpoint(base: &str, path: &str, params: &[(&str, &str)]) -> Result<String> {
    let raw = format!("{}{path}", base.trim_end_matches('/'));
    let url = if params.is_empty() {
        Url::parse(&raw)
    } else {
        Url::parse_with_params(&raw, params)
    };
    url.map(String::from)
        .map_err(|e| BibError::config(format!("invalid endpoint {raw}: {e}")))
}

static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").expect("bracket regex"));
static LIFE_DATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",?\s*(?:b\.\s*)?\d{4}-(?:\d{4})?\.?\s*$").expect("dates regex"));

/// Strip catalogue decorations from a contributor heading:
/// `"Tolkien, J. R. R. (John Ronald Reuel), 1892-1973 [Author]"` → `"Tolkien, J. R. R."`.
pub(crate) fn clean_name(raw: &str) -> String {
    let stripped = BRACKETED_RE.replace_all(raw, " ");
    let stripped = LIFE_DATES_RE.replace(stripped.trim(), "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(&[',', ';'][..])
        .trim()
        .to_string()
}

/// Drop trailing ISBD punctuation (`" /"`, `" :"`, `"."`) from catalogue titles.
pub(crate) fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '/' | ':' | ';' | ',' | '.') || c.is_whitespace())
        .to_string()
}
