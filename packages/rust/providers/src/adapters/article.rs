//! Generic web page and PDF fetcher.

use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use bibresolve_extract::{PageMetadata, extract_html, extract_pdf};
use bibresolve_shared::{BibError, Record, Result, parse_authors};

use crate::normalize::finalize;
use crate::transport::{HttpRequest, HttpResponse, RequestExecutor};

const ACCEPT: &str = "text/html,application/xhtml+xml,application/pdf;q=0.9,*/*;q=0.5";

pub struct ArticleFetcher {
    executor: Arc<dyn RequestExecutor>,
}

impl ArticleFetcher {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    #[instrument(skip(self), fields(provider = "article"))]
    pub async fn lookup_url(&self, page: &str) -> Result<Record> {
        let page = page.trim();
        let parsed = Url::parse(page)
            .map_err(|e| BibError::invalid_key(format!("invalid URL {page:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BibError::invalid_key(format!(
                "unsupported URL scheme {:?}",
                parsed.scheme()
            )));
        }

        let request = HttpRequest::get(parsed.as_str()).header("Accept", ACCEPT);
        let response = self.executor.execute(request).await?.error_for_status()?;

        let meta = if is_pdf(&response) {
            debug!("reading PDF info dictionary");
            extract_pdf(&response.body)?
        } else {
            extract_html(&response.text())
        };

        let source = meta
            .container
            .clone()
            .or_else(|| parsed.host_str().map(str::to_string))
            .unwrap_or_else(|| "the web".to_string());

        finalize(into_record(meta, page), &source)
    }
}

fn is_pdf(response: &HttpResponse) -> bool {
    response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/pdf"))
        || response.body.starts_with(b"%PDF-")
}

fn into_record(meta: PageMetadata, page: &str) -> Record {
    let mut record = Record::new(meta.kind, meta.title.unwrap_or_default());
    record.authors = parse_authors(&meta.authors);
    record.container_title = meta.container.unwrap_or_default();
    record.date = meta.published.unwrap_or_default();
    record.annotation.summary = meta.description.unwrap_or_default();
    record.annotation.add_keywords(&meta.keywords);
    record.set_url(page, "");
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_executor;

    use bibresolve_shared::RecordType;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn html_article() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(
                        r#"<html><head><title>Ignored</title>
<meta property="og:title" content="Writing Parsers">
<meta property="og:site_name" content="Byte Journal">
<meta property="og:type" content="article">
<meta name="author" content="Jane Roe">
<meta property="article:published_time" content="2022-08-01T09:00:00Z">
<meta property="article:tag" content="Rust">
</head><body></body></html>"#,
                    ),
            )
            .mount(&server)
            .await;

        let url = format!("{}/post", server.uri());
        let record = ArticleFetcher::new(test_executor())
            .lookup_url(&url)
            .await
            .unwrap();

        assert_eq!(record.kind, RecordType::Article);
        assert_eq!(record.title, "Writing Parsers");
        assert_eq!(record.container_title, "Byte Journal");
        assert_eq!(record.authors[0].family, "Roe");
        assert_eq!(record.year, Some(2022));
        assert_eq!(record.url, url);
        assert!(!record.accessed.is_empty());
        assert_eq!(
            record.annotation.summary,
            "Bibliographic record for Writing Parsers from Byte Journal."
        );
        assert!(record.annotation.keywords.contains("rust"));
    }

    #[tokio::test]
    async fn pdf_document() {
        let server = MockServer::start().await;
        let pdf = concat!(
            "%PDF-1.4\n",
            "5 0 obj << /Title (Annual Report) /Author (Doe, Jane) ",
            "/CreationDate (D:20210115) >> endobj\n",
            "trailer << /Info 5 0 R >>",
        )
        .as_bytes()
        .to_vec();
        Mock::given(method("GET"))
            .and(path("/report.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(pdf),
            )
            .mount(&server)
            .await;

        let url = format!("{}/report.pdf", server.uri());
        let record = ArticleFetcher::new(test_executor())
            .lookup_url(&url)
            .await
            .unwrap();

        assert_eq!(record.kind, RecordType::Report);
        assert_eq!(record.title, "Annual Report");
        assert_eq!(record.authors[0].family, "Doe");
        assert_eq!(record.date, "2021-01-15");
        assert!(record.annotation.summary.ends_with("from 127.0.0.1."));
    }

    #[tokio::test]
    async fn page_without_title_is_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"),
            )
            .mount(&server)
            .await;

        let err = ArticleFetcher::new(test_executor())
            .lookup_url(&server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, BibError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn non_http_scheme_is_rejected() {
        let err = ArticleFetcher::new(test_executor())
            .lookup_url("ftp://example.org/file")
            .await
            .unwrap_err();
        assert!(matches!(err, BibError::InvalidKey { .. }));
    }
}
