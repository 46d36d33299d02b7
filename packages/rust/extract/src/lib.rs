//! Page metadata extraction from HTML documents and PDF byte streams.
//!
//! HTML pages contribute `<title>`, `<meta>` tags (including OpenGraph) and
//! JSON-LD article entities; PDFs contribute their info dictionary. Both are
//! folded into a single [`PageMetadata`] with a fixed field precedence.

mod entities;
mod html;
mod pdf;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use bibresolve_shared::{RecordType, Result};

pub use entities::unescape;
pub use html::{HtmlMetadata, JsonLdArticle, parse_html};
pub use pdf::{PdfInfo, parse_pdf_info};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Metadata describing a fetched page, independent of its format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    /// Site name or publisher.
    pub container: Option<String>,
    /// Free-form author names, in document order.
    pub authors: Vec<String>,
    /// Publication date as written by the source.
    pub published: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub kind: RecordType,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract page metadata from an HTML document.
///
/// Precedence:
/// - title: JSON-LD `headline` > `og:title` > `<title>`
/// - container: JSON-LD `publisher` > `og:site_name`
/// - authors: JSON-LD `author` > `<meta name="author">`
/// - published: JSON-LD `datePublished` > `article:published_time`
/// - description: JSON-LD > `og:description` > `<meta name="description">`
/// - keywords: JSON-LD > `<meta name="keywords">` plus `article:tag`
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn extract_html(html: &str) -> PageMetadata {
    let meta = parse_html(html);
    let ld = meta.json_ld.clone().unwrap_or_default();

    let title = ld
        .headline
        .clone()
        .or_else(|| meta.property("og:title").map(str::to_string))
        .or_else(|| meta.title.clone());

    let container = ld
        .publisher
        .clone()
        .or_else(|| meta.property("og:site_name").map(str::to_string));

    let authors = if ld.authors.is_empty() {
        meta.name("author")
            .map(|a| vec![a.to_string()])
            .unwrap_or_default()
    } else {
        ld.authors.clone()
    };

    let published = ld
        .date_published
        .clone()
        .or_else(|| meta.property("article:published_time").map(str::to_string));

    let description = ld
        .description
        .clone()
        .or_else(|| meta.property("og:description").map(str::to_string))
        .or_else(|| meta.name("description").map(str::to_string));

    let keywords = if ld.keywords.is_empty() {
        let mut found: Vec<String> = meta
            .name("keywords")
            .map(|k| {
                k.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        found.extend(meta.tags.iter().cloned());
        found
    } else {
        ld.keywords.clone()
    };

    let kind = page_kind(&meta);
    debug!(kind = %kind, has_json_ld = meta.json_ld.is_some(), "extracted HTML metadata");

    PageMetadata {
        title,
        container,
        authors,
        published,
        description,
        keywords,
        kind,
    }
}

/// Extract page metadata from a PDF byte stream.
///
/// `/Author` values are split on `;` and on the word "and"; `D:YYYYMMDD…`
/// creation dates are rewritten as `YYYY-MM-DD`.
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn extract_pdf(bytes: &[u8]) -> Result<PageMetadata> {
    let info = parse_pdf_info(bytes)?;

    let authors = info
        .author
        .as_deref()
        .map(split_pdf_authors)
        .unwrap_or_default();

    Ok(PageMetadata {
        title: info.title,
        container: None,
        authors,
        published: info.creation_date.as_deref().map(pdf_date),
        description: None,
        keywords: Vec::new(),
        kind: RecordType::Report,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn page_kind(meta: &HtmlMetadata) -> RecordType {
    if let Some(ld) = &meta.json_ld {
        return match ld.kind.as_str() {
            "Report" | "Thesis" => RecordType::Report,
            _ => RecordType::Article,
        };
    }

    let og_article = meta
        .property("og:type")
        .is_some_and(|t| t.eq_ignore_ascii_case("article"));
    if og_article || meta.property("article:published_time").is_some() {
        RecordType::Article
    } else {
        RecordType::Website
    }
}

static AND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+and\s+|\s*&\s*").expect("author separator regex"));

fn split_pdf_authors(raw: &str) -> Vec<String> {
    raw.split(';')
        .flat_map(|part| AND_RE.split(part).map(str::to_string).collect::<Vec<_>>())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

static PDF_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^D:(\d{4})(\d{2})?(\d{2})?").expect("pdf date regex"));

/// `D:20190304120000Z` → `2019-03-04`; other shapes pass through.
fn pdf_date(raw: &str) -> String {
    let Some(caps) = PDF_DATE_RE.captures(raw.trim()) else {
        return raw.trim().to_string();
    };
    match (caps.get(2), caps.get(3)) {
        (Some(m), Some(d)) => format!("{}-{}-{}", &caps[1], m.as_str(), d.as_str()),
        (Some(m), None) => format!("{}-{}", &caps[1], m.as_str()),
        _ => caps[1].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ld_wins_over_open_graph() {
        let html = r#"<html><head>
<title>Page Title</title>
<meta property="og:title" content="OG Title">
<meta property="og:site_name" content="OG Site">
<meta name="author" content="Meta Author">
<script type="application/ld+json">{"@type":"Article","headline":"LD Headline",
 "author":"Jane Roe","publisher":"LD Publisher","datePublished":"2021-02-03"}</script>
</head></html>"#;

        let page = extract_html(html);
        assert_eq!(page.title.as_deref(), Some("LD Headline"));
        assert_eq!(page.container.as_deref(), Some("LD Publisher"));
        assert_eq!(page.authors, vec!["Jane Roe"]);
        assert_eq!(page.published.as_deref(), Some("2021-02-03"));
        assert_eq!(page.kind, RecordType::Article);
    }

    #[test]
    fn open_graph_then_title_fallback() {
        let html = r#"<html><head>
<title>Only &amp; Title</title>
<meta property="og:site_name" content="Example">
<meta name="author" content="Meta Author">
<meta name="description" content="Plain description">
<meta name="keywords" content="alpha, beta">
<meta property="article:tag" content="gamma">
</head></html>"#;

        let page = extract_html(html);
        assert_eq!(page.title.as_deref(), Some("Only & Title"));
        assert_eq!(page.container.as_deref(), Some("Example"));
        assert_eq!(page.authors, vec!["Meta Author"]);
        assert_eq!(page.description.as_deref(), Some("Plain description"));
        assert_eq!(page.keywords, vec!["alpha", "beta", "gamma"]);
        assert_eq!(page.kind, RecordType::Website);

        let og = concat!(
            r#"<title>T</title><meta property="og:title" content="OG">"#,
            r#"<meta property="og:type" content="article">"#,
        );
        let page = extract_html(og);
        assert_eq!(page.title.as_deref(), Some("OG"));
        assert_eq!(page.kind, RecordType::Article);
    }

    #[test]
    fn pdf_metadata() {
        let pdf = concat!(
            "%PDF-1.4\n",
            "7 0 obj << /Title (Field Notes) /Author (A. Smith and B. Jones; C. Wu)\n",
            "/CreationDate (D:20190304120000+01'00') >> endobj\n",
            "trailer << /Info 7 0 R >>",
        )
        .as_bytes();
        let page = extract_pdf(pdf).unwrap();
        assert_eq!(page.title.as_deref(), Some("Field Notes"));
        assert_eq!(page.authors, vec!["A. Smith", "B. Jones", "C. Wu"]);
        assert_eq!(page.published.as_deref(), Some("2019-03-04"));
        assert_eq!(page.kind, RecordType::Report);
    }

    #[test]
    fn pdf_date_shapes() {
        assert_eq!(pdf_date("D:2020"), "2020");
        assert_eq!(pdf_date("D:202011"), "2020-11");
        assert_eq!(pdf_date("March 2020"), "March 2020");
    }
}
