//! Canonical record model shared by every provider.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RecordType
// ---------------------------------------------------------------------------

/// The closed set of record kinds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Book,
    Article,
    #[default]
    Website,
    Video,
    Song,
    Movie,
    Report,
    Dataset,
    Software,
}

impl RecordType {
    /// Lowercase name, also used as the fallback keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Article => "article",
            Self::Website => "website",
            Self::Video => "video",
            Self::Song => "song",
            Self::Movie => "movie",
            Self::Report => "report",
            Self::Dataset => "dataset",
            Self::Software => "software",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "book" => Ok(Self::Book),
            "article" => Ok(Self::Article),
            "website" => Ok(Self::Website),
            "video" => Ok(Self::Video),
            "song" => Ok(Self::Song),
            "movie" => Ok(Self::Movie),
            "report" => Ok(Self::Report),
            "dataset" => Ok(Self::Dataset),
            "software" => Ok(Self::Software),
            other => Err(format!("unknown record type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// A single author: family name plus optional given-name initials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
}

impl Author {
    /// Split a free-form name.
    ///
    /// `"Family, Given"` splits on the comma. Without a comma the last
    /// whitespace-separated token is the family name and the remaining tokens
    /// become initials (`"John Ronald Tolkien"` → `Tolkien`, `J. R.`).
    /// Returns `None` for blank input.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return None;
        }

        if let Some((family, given)) = name.split_once(',') {
            let family = family.trim();
            if family.is_empty() {
                return Self::parse(given);
            }
            let given = given.trim();
            return Some(Self {
                family: family.to_string(),
                given: (!given.is_empty()).then(|| given.to_string()),
            });
        }

        let mut tokens: Vec<&str> = name.split(' ').collect();
        let family = tokens.pop().unwrap_or_default().to_string();
        let initials = tokens
            .iter()
            .filter_map(|t| t.chars().find(|c| c.is_alphabetic()))
            .map(|c| format!("{}.", c.to_uppercase()))
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            family,
            given: (!initials.is_empty()).then_some(initials),
        })
    }

    /// Build from already-separated parts (e.g. Crossref `family`/`given`).
    pub fn from_parts(family: &str, given: Option<&str>) -> Option<Self> {
        let family = family.trim();
        if family.is_empty() {
            return given.and_then(Self::parse);
        }
        Some(Self {
            family: family.to_string(),
            given: given
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
        })
    }
}

/// Parse a list of free-form names, dropping blanks.
pub fn parse_authors<I, S>(names: I) -> Vec<Author>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|n| Author::parse(n.as_ref()))
        .collect()
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Free-text summary plus a lowercase keyword set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl Annotation {
    /// Insert keywords, trimming and lowercasing each; blanks are dropped.
    pub fn add_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for kw in keywords {
            let kw = kw.as_ref().trim().to_lowercase();
            if !kw.is_empty() {
                self.keywords.insert(kw);
            }
        }
    }
}

/// The canonical bibliographic record every provider produces.
///
/// Empty strings mean "absent" and are skipped when serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub journal: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub volume: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issue: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pages: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doi: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub isbn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accessed: String,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Record {
    /// An empty record of the given kind and title; everything else blank.
    pub fn new(kind: RecordType, title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind,
            authors: Vec::new(),
            year: None,
            date: String::new(),
            title: title.into(),
            container_title: String::new(),
            publisher: String::new(),
            journal: String::new(),
            volume: String::new(),
            issue: String::new(),
            pages: String::new(),
            doi: String::new(),
            isbn: String::new(),
            url: String::new(),
            accessed: String::new(),
            annotation: Annotation::default(),
        }
    }

    /// Set `url` and `accessed` together. A blank URL clears both.
    pub fn set_url(&mut self, url: &str, accessed: &str) {
        let url = url.trim();
        if url.is_empty() {
            self.url.clear();
            self.accessed.clear();
        } else {
            self.url = url.to_string();
            self.accessed = accessed.to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Id / date helpers
// ---------------------------------------------------------------------------

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("year regex"));

/// First 4-digit run in a date-ish string (`"March 4, 2019"`, `"D:20190304"`).
pub fn year_from_date(date: &str) -> Option<i32> {
    YEAR_RE.find(date).and_then(|m| m.as_str().parse().ok())
}

/// Build a slug id from the first author, year, and leading title words,
/// e.g. `tolkien-1954-the-fellowship-of`.
pub fn generate_id(authors: &[Author], year: Option<i32>, title: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(first) = authors.first() {
        parts.push(first.family.clone());
    }
    if let Some(year) = year {
        parts.push(year.to_string());
    }
    parts.extend(title.split_whitespace().take(3).map(str::to_string));

    let slug = slugify(&parts.join(" "));
    if slug.is_empty() {
        "record".to_string()
    } else {
        slug
    }
}

/// Generate a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// One provider tried during a resolution call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub provider: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Append-only log of attempts for a single resolution call.
#[derive(Debug, Clone, Default)]
pub struct AttemptTrace {
    attempts: Vec<Attempt>,
}

impl AttemptTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self, provider: &str) {
        self.attempts.push(Attempt {
            provider: provider.to_string(),
            success: true,
            error: String::new(),
        });
    }

    pub fn failed(&mut self, provider: &str, error: impl fmt::Display) {
        self.attempts.push(Attempt {
            provider: provider.to_string(),
            success: false,
            error: error.to_string(),
        });
    }

    pub fn into_vec(self) -> Vec<Attempt> {
        self.attempts
    }
}
