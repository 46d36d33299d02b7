//! Crossref REST `works` endpoint.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::instrument;

use bibresolve_extract::unescape;
use bibresolve_shared::{Author, BibError, Record, RecordType, Result};

use super::{endpoint, isbn_key, title_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "Crossref";

pub struct Crossref {
    executor: Arc<dyn RequestExecutor>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Work {
    title: Vec<String>,
    author: Vec<Contributor>,
    publisher: Option<String>,
    issued: Option<DateParts>,
    #[serde(rename = "published-print")]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online")]
    published_online: Option<DateParts>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "container-title")]
    container_title: Vec<String>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "abstract")]
    abstract_: Option<String>,
    subject: Vec<String>,
    #[serde(rename = "ISBN")]
    isbn: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Contributor {
    family: Option<String>,
    given: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DateParts {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    /// `[[2019, 3, 4]]` → (`2019`, `"2019-03-04"`).
    fn resolve(&self) -> Option<(i32, String)> {
        let parts: Vec<i32> = self.date_parts.first()?.iter().map_while(|p| *p).collect();
        let year = *parts.first()?;
        let date = match parts.as_slice() {
            [y, m, d, ..] => format!("{y:04}-{m:02}-{d:02}"),
            [y, m] => format!("{y:04}-{m:02}"),
            _ => format!("{year:04}"),
        };
        Some((year, date))
    }
}

impl Crossref {
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "crossref"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        let filter = format!("isbn:{isbn}");
        let mut record = self
            .works(&[("filter", filter.as_str()), ("rows", "1")])
            .await?;
        record.isbn = isbn;
        finalize(record, SOURCE)
    }

    #[instrument(skip(self), fields(provider = "crossref"))]
    pub async fn lookup_title_author(&self, title: &str, author: &str) -> Result<Record> {
        let (title, author) = title_key(title, author)?;
        let mut params = vec![("query.bibliographic", title)];
        if !author.is_empty() {
            params.push(("query.author", author));
        }
        params.push(("rows", "1"));

        let record = self.works(&params).await?;
        finalize(record, SOURCE)
    }

    async fn works(&self, params: &[(&str, &str)]) -> Result<Record> {
        let url = endpoint(&self.base_url, "/works", params)?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let works: WorksResponse = response.json()?;
        let work = works
            .message
            .items
            .into_iter()
            .next()
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} returned no works")))?;

        Ok(map_work(work))
    }
}

fn map_work(work: Work) -> Record {
    let kind = record_type(work.kind.as_deref().unwrap_or_default());
    let title = work.title.into_iter().next().unwrap_or_default();

    let mut record = Record::new(kind, title);
    record.authors = work
        .author
        .iter()
        .filter_map(|c| match (&c.family, &c.name) {
            (Some(family), _) => Author::from_parts(family, c.given.as_deref()),
            (None, Some(name)) => Author::parse(name),
            (None, None) => None,
        })
        .collect();

    if let Some((year, date)) = [&work.published_print, &work.issued, &work.published_online]
        .into_iter()
        .flatten()
        .find_map(DateParts::resolve)
    {
        record.year = Some(year);
        record.date = date;
    }

    let container = work.container_title.into_iter().next().unwrap_or_default();
    if kind == RecordType::Article {
        record.journal = container;
    } else {
        record.container_title = container;
    }

    record.publisher = work.publisher.unwrap_or_default();
    record.doi = work.doi.unwrap_or_default();
    record.url = work.url.unwrap_or_default();
    record.volume = work.volume.unwrap_or_default();
    record.issue = work.issue.unwrap_or_default();
    record.pages = work.page.unwrap_or_default();
    record.isbn = work.isbn.into_iter().next().unwrap_or_default();
    record.annotation.summary = work.abstract_.as_deref().map(strip_jats).unwrap_or_default();
    record.annotation.add_keywords(&work.subject);
    record
}

fn record_type(kind: &str) -> RecordType {
    match kind {
        "journal-article" | "proceedings-article" | "posted-content" | "peer-review" => {
            RecordType::Article
        }
        "report" | "report-series" => RecordType::Report,
        "dataset" => RecordType::Dataset,
        _ => RecordType::Book,
    }
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static ABSTRACT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)abstract\s*[:.]?\s+").expect("label regex"));

/// `<jats:p>Text</jats:p>` → `Text`.
fn strip_jats(raw: &str) -> String {
    let text = unescape(&TAG_RE.replace_all(raw, " "));
    ABSTRACT_LABEL_RE.replace(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_executor;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn journal_article_by_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .and(query_param("query.bibliographic", "deep residual learning"))
            .and(query_param("query.author", "he"))
            .and(query_param("rows", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": {"items": [{
                    "type": "journal-article",
                    "title": ["Deep Residual Learning"],
                    "author": [
                        {"given": "Kaiming", "family": "He"},
                        {"name": "The Vision Consortium"}
                    ],
                    "container-title": ["Journal of Vision"],
                    "published-print": {"date-parts": [[2016, 6]]},
                    "issued": {"date-parts": [[2015, 12, 10]]},
                    "DOI": "10.1000/xyz",
                    "URL": "https://doi.org/10.1000/xyz",
                    "volume": "7", "issue": "2", "page": "770-778",
                    "abstract": concat!(
                        "<jats:title>Abstract</jats:title>",
                        "<jats:p>Deeper networks &amp; easier training.</jats:p>",
                    ),
                    "subject": ["Computer Vision"]
                }]}
            })))
            .mount(&server)
            .await;

        let provider = Crossref::new(test_executor(), server.uri());
        let record = provider
            .lookup_title_author("deep residual learning", "he")
            .await
            .unwrap();

        assert_eq!(record.kind, RecordType::Article);
        assert_eq!(record.journal, "Journal of Vision");
        assert_eq!(record.year, Some(2016));
        assert_eq!(record.date, "2016-06");
        assert_eq!(record.authors[0].given.as_deref(), Some("Kaiming"));
        assert_eq!(record.authors[1].family, "Consortium");
        assert_eq!(record.authors[1].given.as_deref(), Some("T. V."));
        assert_eq!(record.pages, "770-778");
        assert_eq!(record.annotation.summary, "Deeper networks & easier training.");
        assert!(record.annotation.keywords.contains("computer vision"));
        assert!(!record.accessed.is_empty());
    }

    #[tokio::test]
    async fn isbn_filter_maps_books() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .and(query_param("filter", "isbn:9780262033848"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"items": [{
                    "type": "monograph",
                    "title": ["Introduction to Algorithms"],
                    "publisher": "MIT Press",
                    "issued": {"date-parts": [[2009]]}
                }]}
            })))
            .mount(&server)
            .await;

        let provider = Crossref::new(test_executor(), server.uri());
        let record = provider.lookup_isbn("978-0-262-03384-8").await.unwrap();
        assert_eq!(record.kind, RecordType::Book);
        assert_eq!(record.year, Some(2009));
        assert_eq!(record.isbn, "9780262033848");
        assert!(record.annotation.keywords.contains("book"));
    }

    #[tokio::test]
    async fn zero_items_is_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": {"items": []}})),
            )
            .mount(&server)
            .await;

        let provider = Crossref::new(test_executor(), server.uri());
        let err = provider.lookup_isbn("111").await.unwrap_err();
        assert!(matches!(err, BibError::EmptyResult(_)));
    }

    #[test]
    fn type_mapping() {
        assert_eq!(record_type("report"), RecordType::Report);
        assert_eq!(record_type("dataset"), RecordType::Dataset);
        assert_eq!(record_type("edited-book"), RecordType::Book);
    }
}
