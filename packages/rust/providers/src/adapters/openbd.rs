//! openBD (Japanese books).

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use bibresolve_shared::{BibError, Record, RecordType, Result, parse_authors};

use super::{endpoint, isbn_forms, isbn_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "openBD";

/// Separates a contributor name from its role (`村上春樹／著`).
const ROLE_MARK: char = '／';

pub struct OpenBd {
    executor: Arc<dyn RequestExecutor>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Entry {
    summary: Summary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Summary {
    isbn: String,
    title: String,
    volume: String,
    series: String,
    publisher: String,
    pubdate: String,
    author: String,
}

impl OpenBd {
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "openbd"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        // openBD is keyed by ISBN-13
        let query = isbn_forms(&isbn)
            .into_iter()
            .find(|form| form.len() == 13)
            .unwrap_or_else(|| isbn.clone());
        let url = endpoint(&self.base_url, "/get", &[("isbn", &query)])?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        // Unknown ISBNs come back as `[null]`.
        let entries: Vec<Option<Entry>> = response.json()?;
        let summary = entries
            .into_iter()
            .flatten()
            .next()
            .map(|e| e.summary)
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} has no entry for {isbn}")))?;

        let title = match summary.volume.trim() {
            "" => summary.title.clone(),
            volume => format!("{} {volume}", summary.title.trim()),
        };

        let mut record = Record::new(RecordType::Book, title);
        record.authors = parse_authors(split_authors(&summary.author));
        record.publisher = summary.publisher.trim().to_string();
        record.date = pubdate(&summary.pubdate);
        record.container_title = summary.series.trim().to_string();
        record.isbn = if summary.isbn.trim().is_empty() {
            isbn
        } else {
            summary.isbn.trim().to_string()
        };

        finalize(record, SOURCE)
    }
}

/// `"村上春樹／著 安西水丸／イラスト"` → `["村上春樹", "安西水丸"]`.
///
/// Names are delimited by the role mark; a string without any role mark is
/// one name, and trailing tokens after the last role form a final name.
fn split_authors(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if !raw.contains(ROLE_MARK) {
        return if raw.is_empty() {
            Vec::new()
        } else {
            vec![raw.to_string()]
        };
    }

    let mut names = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    for token in raw.split_whitespace() {
        match token.split_once(ROLE_MARK) {
            Some((name, _role)) => {
                pending.push(name);
                let name = pending.join(" ").trim().to_string();
                if !name.is_empty() {
                    names.push(name);
                }
                pending.clear();
            }
            None => pending.push(token),
        }
    }
    let trailing = pending.join(" ");
    if !trailing.is_empty() {
        names.push(trailing);
    }
    names
}

/// `20190304` → `2019-03-04`; other shapes pass through.
fn pubdate(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_executor;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn author_strings_split_on_roles() {
        assert_eq!(
            split_authors("村上春樹／著 安西水丸／イラスト"),
            vec!["村上春樹", "安西水丸"]
        );
        assert_eq!(split_authors("Haruki Murakami"), vec!["Haruki Murakami"]);
        assert_eq!(split_authors("村上春樹／著 安西水丸"), vec!["村上春樹", "安西水丸"]);
        assert!(split_authors("  ").is_empty());
    }

    #[tokio::test]
    async fn isbn_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/get"))
            .and(query_param("isbn", "9784103534228"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "summary": {
                    "isbn": "9784103534228",
                    "title": "街とその不確かな壁",
                    "volume": "",
                    "series": "",
                    "publisher": "新潮社",
                    "pubdate": "20230413",
                    "author": "村上春樹／著"
                }
            }])))
            .mount(&server)
            .await;

        let provider = OpenBd::new(test_executor(), format!("{}/v1", server.uri()));
        let record = provider.lookup_isbn("978-4-10-353422-8").await.unwrap();

        assert_eq!(record.title, "街とその不確かな壁");
        assert_eq!(record.isbn, "9784103534228");
        assert_eq!(record.authors[0].family, "村上春樹");
        assert_eq!(record.date, "2023-04-13");
        assert_eq!(record.year, Some(2023));
        assert_eq!(record.publisher, "新潮社");
        assert_eq!(
            record.annotation.summary,
            "Bibliographic record for 街とその不確かな壁 from openBD."
        );
    }

    #[tokio::test]
    async fn isbn10_key_is_queried_as_isbn13() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("isbn", "9784103534228"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "summary": {"title": "街とその不確かな壁", "author": "村上春樹／著"}
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenBd::new(test_executor(), server.uri());
        let record = provider.lookup_isbn("4-10-353422-2").await.unwrap();
        assert_eq!(record.title, "街とその不確かな壁");
        // no isbn in the summary: the normalized key is kept
        assert_eq!(record.isbn, "4103534222");
    }

    #[tokio::test]
    async fn null_entry_is_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[null]"))
            .mount(&server)
            .await;

        let provider = OpenBd::new(test_executor(), server.uri());
        let err = provider.lookup_isbn("111").await.unwrap_err();
        assert!(matches!(err, BibError::EmptyResult(_)));
    }
}
