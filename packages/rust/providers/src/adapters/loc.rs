//! Library of Congress JSON search API.

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use bibresolve_shared::{BibError, Record, RecordType, Result, parse_authors};

use super::{clean_name, clean_title, endpoint, isbn_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "Library of Congress";

pub struct LibraryOfCongress {
    executor: Arc<dyn RequestExecutor>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Item {
    title: Option<String>,
    date: Option<String>,
    url: Option<String>,
    id: Option<String>,
    contributor: Vec<String>,
    subject: Vec<String>,
}

impl LibraryOfCongress {
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "loc"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        let query = format!("isbn:{isbn}");
        let url = endpoint(&self.base_url, "/search/", &[("q", &query), ("fo", "json")])?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let search: SearchResponse = response.json()?;
        let item = search
            .results
            .into_iter()
            .find(|item| item.title.as_deref().is_some_and(|t| !t.trim().is_empty()))
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} returned no results")))?;

        let mut record = Record::new(
            RecordType::Book,
            clean_title(item.title.as_deref().unwrap_or_default()),
        );
        record.authors = parse_authors(
            item.contributor
                .iter()
                .map(|c| clean_name(c))
                .filter(|c| !c.is_empty()),
        );
        record.date = item.date.unwrap_or_default();
        record.url = item.url.or(item.id).unwrap_or_default();
        record.isbn = isbn;
        record.annotation.add_keywords(&item.subject);

        finalize(record, SOURCE)
    }
}
