//! Google Books volumes API.

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use bibresolve_shared::{BibError, Record, RecordType, Result, parse_authors};

use super::{endpoint, isbn_key, title_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "Google Books";

pub struct GoogleBooks {
    executor: Arc<dyn RequestExecutor>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Volumes {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    categories: Vec<String>,
    info_link: Option<String>,
    industry_identifiers: Vec<Identifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Identifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl GoogleBooks {
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "googlebooks"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        let mut record = self.query(&format!("isbn:{isbn}")).await?;
        record.isbn = isbn;
        finalize(record, SOURCE)
    }

    #[instrument(skip(self), fields(provider = "googlebooks"))]
    pub async fn lookup_title_author(&self, title: &str, author: &str) -> Result<Record> {
        let (title, author) = title_key(title, author)?;
        let q = if author.is_empty() {
            format!("intitle:{title}")
        } else {
            format!("intitle:{title} inauthor:{author}")
        };
        let record = self.query(&q).await?;
        finalize(record, SOURCE)
    }

    async fn query(&self, q: &str) -> Result<Record> {
        let url = endpoint(&self.base_url, "/volumes", &[("q", q)])?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let volumes: Volumes = response.json()?;
        let info = volumes
            .items
            .into_iter()
            .next()
            .map(|v| v.volume_info)
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} returned no volumes")))?;

        let title = match info.subtitle.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(sub) => format!("{}: {sub}", info.title.trim()),
            None => info.title.clone(),
        };

        let mut record = Record::new(RecordType::Book, title);
        record.authors = parse_authors(&info.authors);
        record.publisher = info.publisher.unwrap_or_default();
        record.date = info.published_date.unwrap_or_default();
        record.url = info.info_link.unwrap_or_default();
        record.isbn = preferred_isbn(&info.industry_identifiers);
        record.annotation.summary = info.description.unwrap_or_default();
        record.annotation.add_keywords(&info.categories);
        Ok(record)
    }
}

/// ISBN-13 when present, else ISBN-10.
fn preferred_isbn(ids: &[Identifier]) -> String {
    ["ISBN_13", "ISBN_10"]
        .iter()
        .find_map(|kind| ids.iter().find(|id| id.kind == *kind))
        .map(|id| id.identifier.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_executor;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn isbn_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .and(query_param("q", "isbn:9780306406157"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalItems": 1,
                "items": [{"volumeInfo": {
                    "title": "Signals",
                    "subtitle": "An Introduction",
                    "authors": ["Grace Brewster Hopper"],
                    "publisher": "Plenum",
                    "publishedDate": "1994-03",
                    "description": "A primer.",
                    "categories": ["Technology & Engineering"],
                    "infoLink": "https://books.google.com/books?id=abc"
                }}]
            })))
            .mount(&server)
            .await;

        let provider = GoogleBooks::new(test_executor(), server.uri());
        let record = provider.lookup_isbn("978-0-306-40615-7").await.unwrap();

        assert_eq!(record.title, "Signals: An Introduction");
        assert_eq!(record.authors[0].family, "Hopper");
        assert_eq!(record.authors[0].given.as_deref(), Some("G. B."));
        assert_eq!(record.year, Some(1994));
        assert_eq!(record.isbn, "9780306406157");
        assert_eq!(record.annotation.summary, "A primer.");
        assert!(record.annotation.keywords.contains("technology & engineering"));
        assert_eq!(record.url, "https://books.google.com/books?id=abc");
        assert!(!record.accessed.is_empty());
    }

    #[tokio::test]
    async fn zero_items_is_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"kind": "books#volumes", "totalItems": 0})),
            )
            .mount(&server)
            .await;

        let provider = GoogleBooks::new(test_executor(), server.uri());
        let err = provider.lookup_isbn("111").await.unwrap_err();
        assert!(matches!(err, BibError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn title_author_query_and_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .and(query_param("q", "intitle:dune inauthor:herbert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "0441013597"},
                        {"type": "ISBN_13", "identifier": "9780441013593"}
                    ]
                }}]
            })))
            .mount(&server)
            .await;

        let provider = GoogleBooks::new(test_executor(), server.uri());
        let record = provider.lookup_title_author("dune", "herbert").await.unwrap();
        assert_eq!(record.isbn, "9780441013593");
        assert!(record.url.is_empty() && record.accessed.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = GoogleBooks::new(test_executor(), server.uri());
        let err = provider.lookup_isbn("111").await.unwrap_err();
        assert!(matches!(err, BibError::Status { status: 503, .. }));
    }
}
