//! British National Bibliography SPARQL endpoint.
//!
//! The normalized ISBN, and its other ISBN form when the check digit holds,
//! are interpolated into a fixed query template, so keys containing anything
//! but digits and `X` are refused before a request is built.

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use bibresolve_shared::{BibError, Record, RecordType, Result, isbn, parse_authors};

use super::{clean_name, clean_title, isbn_forms, isbn_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "British National Bibliography";

const QUERY_TEMPLATE: &str = r#"PREFIX bibo: <http://purl.org/ontology/bibo/>
PREFIX dct: <http://purl.org/dc/terms/>
PREFIX foaf: <http://xmlns.com/foaf/0.1/>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX blt: <http://www.bl.uk/schemas/bibliographic/blterms#>
PREFIX event: <http://purl.org/NET/c4dm/event.owl#>
SELECT ?title ?creatorName ?publisherName ?date WHERE {
  VALUES ?isbn { {isbns} }
  ?book bibo:isbn10|bibo:isbn13 ?isbn ;
        dct:title ?title .
  OPTIONAL { ?book dct:creator ?creator . ?creator foaf:name ?creatorName . }
  OPTIONAL {
    ?book blt:publication ?publication .
    OPTIONAL { ?publication event:agent ?agent . ?agent rdfs:label ?publisherName . }
    OPTIONAL { ?publication event:time ?time . ?time rdfs:label ?date . }
  }
}
LIMIT 10"#;

pub struct Bnb {
    executor: Arc<dyn RequestExecutor>,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: Bindings,
}

#[derive(Debug, Deserialize)]
struct Bindings {
    #[serde(default)]
    bindings: Vec<Binding>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Binding {
    title: Option<Term>,
    creator_name: Option<Term>,
    publisher_name: Option<Term>,
    date: Option<Term>,
}

#[derive(Debug, Deserialize)]
struct Term {
    value: String,
}

fn value(term: &Option<Term>) -> Option<&str> {
    term.as_ref()
        .map(|t| t.value.trim())
        .filter(|v| !v.is_empty())
}

/// The SPARQL text matching any of `isbns`.
pub(crate) fn build_query(isbns: &[String]) -> Result<String> {
    if let Some(bad) = isbns.iter().find(|i| !isbn::is_isbn_charset(i)) {
        return Err(BibError::invalid_key(format!(
            "{bad:?} is not a plain ISBN and cannot be used in a SPARQL query"
        )));
    }
    let values: Vec<String> = isbns.iter().map(|i| format!("\"{i}\"")).collect();
    Ok(QUERY_TEMPLATE.replace("{isbns}", &values.join(" ")))
}

impl Bnb {
    pub fn new(executor: Arc<dyn RequestExecutor>, endpoint: impl Into<String>) -> Self {
        Self {
            executor,
            endpoint: endpoint.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "bnb"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        let query = build_query(&isbn_forms(&isbn))?;

        let request = HttpRequest::post_form(self.endpoint.as_str(), &[("query", query.as_str())])
            .header("Accept", "application/sparql-results+json");
        let response = self.executor.execute(request).await?.error_for_status()?;

        let results: SparqlResults = response.json()?;
        let bindings = results.results.bindings;
        let first = bindings
            .iter()
            .find(|b| value(&b.title).is_some())
            .ok_or_else(|| BibError::EmptyResult(format!("{SOURCE} has no record for {isbn}")))?;

        let mut creators: Vec<String> = Vec::new();
        for name in bindings.iter().filter_map(|b| value(&b.creator_name)) {
            let name = clean_name(name);
            if !name.is_empty() && !creators.contains(&name) {
                creators.push(name);
            }
        }

        let mut record = Record::new(
            RecordType::Book,
            clean_title(value(&first.title).unwrap_or_default()),
        );
        record.authors = parse_authors(&creators);
        record.publisher = value(&first.publisher_name).unwrap_or_default().to_string();
        record.date = value(&first.date).unwrap_or_default().to_string();
        record.isbn = isbn;

        finalize(record, SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_executor;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn query_interpolates_only_plain_isbns() {
        let query = build_query(&isbn_forms("9780306406157")).unwrap();
        assert!(query.contains(r#"VALUES ?isbn { "9780306406157" "0306406152" }"#));
        assert!(!query.contains("{isbns}"));

        let err = build_query(&[r#"1" } DROP ALL #"#.to_string()]).unwrap_err();
        assert!(matches!(err, BibError::InvalidKey { .. }));
    }

    #[tokio::test]
    async fn sparql_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sparql"))
            .and(header("accept", "application/sparql-results+json"))
            .and(body_string_contains("9780306406157"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "head": {"vars": ["title", "creatorName", "publisherName", "date"]},
                "results": {"bindings": [
                    {
                        "title": {"type": "literal", "value": "Signals and systems /"},
                        "creatorName": {"type": "literal", "value": "Oppenheim, Alan V."},
                        "publisherName": {"type": "literal", "value": "Prentice Hall"},
                        "date": {"type": "literal", "value": "1997"}
                    },
                    {
                        "title": {"type": "literal", "value": "Signals and systems /"},
                        "creatorName": {"type": "literal", "value": "Willsky, Alan S."}
                    }
                ]}
            })))
            .mount(&server)
            .await;

        let provider = Bnb::new(test_executor(), format!("{}/sparql", server.uri()));
        let record = provider.lookup_isbn("978-0-306-40615-7").await.unwrap();

        assert_eq!(record.title, "Signals and systems");
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.authors[1].family, "Willsky");
        assert_eq!(record.publisher, "Prentice Hall");
        assert_eq!(record.year, Some(1997));
    }

    #[tokio::test]
    async fn empty_bindings_is_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "head": {"vars": []}, "results": {"bindings": []}
            })))
            .mount(&server)
            .await;

        let provider = Bnb::new(test_executor(), server.uri());
        let err = provider.lookup_isbn("111").await.unwrap_err();
        assert!(matches!(err, BibError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn unsafe_key_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = Bnb::new(test_executor(), server.uri());
        let err = provider.lookup_isbn("12\"3").await.unwrap_err();
        assert!(matches!(err, BibError::InvalidKey { .. }));
    }
}
