//! Parse strategies for quasi-structured model output.
//!
//! Each strategy is a pure `&str -> Option<T>`; `None` hands the text to the
//! next strategy in the ladder.

use serde::de::DeserializeOwned;

/// A named parse strategy.
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&str) -> Option<T>,
}

/// Keyword strategies in the order they are tried.
pub const KEYWORD_LADDER: &[Strategy<Vec<String>>] = &[
    Strategy {
        name: "strict",
        run: strict_array,
    },
    Strategy {
        name: "embedded",
        run: embedded_array,
    },
    Strategy {
        name: "salvage",
        run: salvage_list,
    },
];

/// Characters trimmed from each salvaged piece.
const SALVAGE_TRIM: &[char] = &['[', ']', '"', '\'', '`', '{', '}'];

// ---------------------------------------------------------------------------
// Keyword strategies
// ---------------------------------------------------------------------------

/// Strategy 1: the whole text is a JSON array.
pub(crate) fn strict_array(text: &str) -> Option<Vec<String>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text.trim()).ok()?;
    non_empty(string_items(values))
}

/// Strategy 2: decode the span from the first `[` to the last `]`.
pub(crate) fn embedded_array(text: &str) -> Option<Vec<String>> {
    let span = delimited(text, '[', ']')?;
    let values: Vec<serde_json::Value> = serde_json::from_str(span).ok()?;
    non_empty(string_items(values))
}

/// Strategy 3: split on commas, or on newlines when there are no commas.
pub(crate) fn salvage_list(text: &str) -> Option<Vec<String>> {
    let pieces: Vec<&str> = if text.contains(',') {
        text.split(',').collect()
    } else if text.contains('\n') {
        text.lines().collect()
    } else {
        vec![text]
    };

    let items = pieces
        .into_iter()
        .map(|p| {
            p.trim_matches(|c: char| c.is_whitespace() || SALVAGE_TRIM.contains(&c))
                .to_lowercase()
        })
        .filter(|p| !p.is_empty())
        .collect();

    non_empty(items)
}

// ---------------------------------------------------------------------------
// Object strategies
// ---------------------------------------------------------------------------

/// Strategy 1 for objects: strict decode of the whole text.
pub(crate) fn strict_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::from_str(text.trim()).ok()
}

/// Strategy 2 for objects: decode the span from the first `{` to the last `}`.
pub(crate) fn embedded_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::from_str(delimited(text, '{', '}')?).ok()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Slice from the first `open` to the last `close`, inclusive.
fn delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Trimmed, lowercased string items; numbers are kept as text, other values dropped.
fn string_items(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    (!items.is_empty()).then_some(items)
}
