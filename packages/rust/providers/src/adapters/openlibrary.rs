//! Open Library books API and search.
//!
//! An ISBN lookup issues two requests: `jscmd=data` for the record itself and
//! a best-effort `jscmd=details` for the description and subject headings.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use bibresolve_shared::{BibError, Record, RecordType, Result, parse_authors};

use super::{endpoint, isbn_key, title_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "Open Library";

pub struct OpenLibrary {
    executor: Arc<dyn RequestExecutor>,
    base_url: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BookData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<Named>,
    #[serde(default)]
    publishers: Vec<Named>,
    #[serde(default)]
    publish_date: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    subjects: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct BookDetails {
    #[serde(default)]
    details: Option<DetailFields>,
}

#[derive(Debug, Deserialize)]
struct DetailFields {
    #[serde(default)]
    description: Option<Description>,
    #[serde(default)]
    subjects: Vec<String>,
}

/// Open Library writes descriptions either as a plain string or as
/// `{"type": "/type/text", "value": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Typed { value: String },
}

impl Description {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) | Self::Typed { value: s } => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    first_publish_year: Option<i32>,
    #[serde(default)]
    publisher: Vec<String>,
    #[serde(default)]
    isbn: Vec<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    subject: Vec<String>,
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl OpenLibrary {
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "openlibrary"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        let bibkey = format!("ISBN:{isbn}");

        let url = endpoint(
            &self.base_url,
            "/api/books",
            &[("bibkeys", &bibkey), ("format", "json"), ("jscmd", "data")],
        )?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let mut books: HashMap<String, BookData> = response.json()?;
        let data = books
            .remove(&bibkey)
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} has no entry for {bibkey}")))?;

        if data.title.trim().is_empty() {
            return Err(BibError::EmptyResult(format!("{SOURCE} entry {bibkey} has no title")));
        }

        let title = full_title(&data.title, data.subtitle.as_deref());
        let mut record = Record::new(RecordType::Book, title);
        record.authors = parse_authors(data.authors.iter().map(|a| a.name.as_str()));
        record.publisher = data
            .publishers
            .first()
            .map(|p| p.name.trim().to_string())
            .unwrap_or_default();
        record.date = data.publish_date.unwrap_or_default();
        record.isbn = isbn.clone();
        if let Some(url) = data.url.as_deref() {
            record.url = url.trim().to_string();
        }
        record
            .annotation
            .add_keywords(data.subjects.iter().map(|s| s.name.as_str()));

        match self.details(&bibkey).await {
            Ok(Some(details)) => {
                if let Some(description) = details.description {
                    record.annotation.summary = description.into_text();
                }
                record.annotation.add_keywords(&details.subjects);
            }
            Ok(None) => debug!(%bibkey, "no detail entry"),
            Err(e) => debug!(%bibkey, error = %e, "detail lookup failed"),
        }

        finalize(record, SOURCE)
    }

    /// The `jscmd=details` view for one bibkey.
    async fn details(&self, bibkey: &str) -> Result<Option<DetailFields>> {
        let url = endpoint(
            &self.base_url,
            "/api/books",
            &[("bibkeys", bibkey), ("format", "json"), ("jscmd", "details")],
        )?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let mut entries: HashMap<String, BookDetails> = response.json()?;
        Ok(entries.remove(bibkey).and_then(|entry| entry.details))
    }

    #[instrument(skip(self), fields(provider = "openlibrary"))]
    pub async fn lookup_title_author(&self, title: &str, author: &str) -> Result<Record> {
        let (title, author) = title_key(title, author)?;

        let mut params = vec![("title", title)];
        if !author.is_empty() {
            params.push(("author", author));
        }
        params.push(("limit", "1"));

        let url = endpoint(&self.base_url, "/search.json", &params)?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let search: SearchResponse = response.json()?;
        let doc = search
            .docs
            .into_iter()
            .next()
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} search matched nothing")))?;

        let mut record = Record::new(RecordType::Book, doc.title);
        record.authors = parse_authors(&doc.author_name);
        record.year = doc.first_publish_year;
        record.publisher = doc.publisher.into_iter().next().unwrap_or_default();
        record.isbn = doc.isbn.into_iter().next().unwrap_or_default();
        if let Some(key) = doc.key.filter(|k| k.starts_with('/')) {
            record.url = format!("{}{key}", self.base_url.trim_end_matches('/'));
        }
        record.annotation.add_keywords(&doc.subject);

        finalize(record, SOURCE)
    }
}

fn full_title(title: &str, subtitle: Option<&str>) -> String {
    match subtitle.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sub) => format!("{}: {sub}", title.trim()),
        None => title.trim().to_string(),
    }
}
