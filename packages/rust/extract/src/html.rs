//! HTML `<meta>`, `<title>` and JSON-LD extraction.

use std::collections::HashMap;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::entities::unescape;

/// Raw metadata pulled from an HTML document, before precedence is applied.
#[derive(Debug, Clone, Default)]
pub struct HtmlMetadata {
    /// Text of the first `<title>`.
    pub title: Option<String>,
    /// `<meta name=…>` keyed by lowercased name; first occurrence wins.
    pub names: HashMap<String, String>,
    /// `<meta property=…>` (OpenGraph and friends); first occurrence wins.
    pub properties: HashMap<String, String>,
    /// All `article:tag` property values, in document order.
    pub tags: Vec<String>,
    /// First article-like JSON-LD entity.
    pub json_ld: Option<JsonLdArticle>,
}

impl HtmlMetadata {
    pub fn name(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Fields read from an article-like JSON-LD object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdArticle {
    pub kind: String,
    pub headline: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub date_published: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
}

/// Parse an HTML document into its raw metadata.
pub fn parse_html(html: &str) -> HtmlMetadata {
    let doc = Html::parse_document(html);
    let mut out = HtmlMetadata::default();

    let title_sel = Selector::parse("title").unwrap();
    out.title = doc
        .select(&title_sel)
        .next()
        .map(|el| collapse(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let meta_sel = Selector::parse("meta[content]").unwrap();
    for el in doc.select(&meta_sel) {
        let value = el.value();
        let Some(content) = value.attr("content").map(collapse) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }

        if let Some(name) = value.attr("name") {
            out.names
                .entry(name.trim().to_lowercase())
                .or_insert_with(|| content.clone());
        }
        if let Some(property) = value.attr("property") {
            let property = property.trim().to_lowercase();
            if property == "article:tag" {
                out.tags.push(content.clone());
            }
            out.properties.entry(property).or_insert(content);
        }
    }

    let ld_sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    out.json_ld = doc.select(&ld_sel).find_map(|el| {
        let raw = el.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => find_article(&value).map(read_article),
            Err(e) => {
                debug!(error = %e, "skipping malformed JSON-LD block");
                None
            }
        }
    });

    out
}

/// Whitespace runs to single spaces. Entities in DOM text and attributes are
/// already decoded by the parser.
fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

/// The object itself, the first element of an array, or an `@graph` member.
fn find_article(value: &Value) -> Option<&Value> {
    let candidate = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };

    if is_article_like(candidate) {
        return Some(candidate);
    }

    candidate
        .get("@graph")?
        .as_array()?
        .iter()
        .find(|item| is_article_like(item))
}

fn is_article_like(value: &Value) -> bool {
    let types: Vec<&str> = match value.get("@type") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => return false,
    };

    types.iter().any(|t| {
        t.ends_with("Article")
            || matches!(
                *t,
                "BlogPosting" | "LiveBlogPosting" | "SocialMediaPosting" | "Report" | "Thesis"
            )
    })
}

fn read_article(value: &Value) -> JsonLdArticle {
    let kind = match value.get("@type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    JsonLdArticle {
        kind,
        headline: text_field(value, "headline").or_else(|| text_field(value, "name")),
        authors: value.get("author").map(names).unwrap_or_default(),
        publisher: value
            .get("publisher")
            .and_then(|p| names(p).into_iter().next()),
        date_published: text_field(value, "datePublished"),
        description: text_field(value, "description"),
        keywords: value.get("keywords").map(keyword_list).unwrap_or_default(),
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .map(unescape)
        .filter(|s| !s.is_empty())
}

/// A string, an object with `name`, or an array of either.
fn names(value: &Value) -> Vec<String> {
    let found: Vec<String> = match value {
        Value::String(s) => vec![unescape(s)],
        Value::Object(_) => text_field(value, "name").into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(names).collect(),
        _ => Vec::new(),
    };
    found.into_iter().filter(|s| !s.is_empty()).collect()
}

/// A comma-separated string or an array of strings.
fn keyword_list(value: &Value) -> Vec<String> {
    let found: Vec<String> = match value {
        Value::String(s) => s.split(',').map(unescape).collect(),
        Value::Array(items) => items.iter().filter_map(Value::as_str).map(unescape).collect(),
        _ => Vec::new(),
    };
    found.into_iter().filter(|s| !s.is_empty()).collect()
}
