//! Resilient recovery of structured data from generative-model output.
//!
//! Model replies are untrusted: they may wrap JSON in prose, fence it in
//! Markdown, or ignore the requested format entirely. The parsers here try an
//! ordered ladder of strategies and fail loudly when every one comes up empty.
//!
//! Deduplication and ordering are left to callers so the parser stays usable
//! for payloads other than keyword lists.

mod envelope;
mod parser;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use bibresolve_shared::{BibError, Result};

pub use envelope::extract_generated_text;
pub use parser::{KEYWORD_LADDER, Strategy};

/// Parse a keyword list. Items come back trimmed and lowercased.
pub fn parse_keywords(text: &str) -> Result<Vec<String>> {
    run_ladder(KEYWORD_LADDER, text, "keyword list")
}

/// Parse a JSON object into `T` (strict decode, then the outermost `{…}` span).
pub fn parse_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let ladder: [Strategy<T>; 2] = [
        Strategy {
            name: "strict",
            run: parser::strict_object::<T>,
        },
        Strategy {
            name: "embedded",
            run: parser::embedded_object::<T>,
        },
    ];
    run_ladder(&ladder, text, "JSON object")
}

/// Try each strategy in order; the first `Some` wins.
pub fn run_ladder<T>(ladder: &[Strategy<T>], text: &str, what: &str) -> Result<T> {
    for strategy in ladder {
        if let Some(value) = (strategy.run)(text) {
            debug!(strategy = strategy.name, "parsed {what}");
            return Ok(value);
        }
        trace!(strategy = strategy.name, "strategy produced nothing");
    }

    let preview: String = text.chars().take(80).collect();
    Err(BibError::parse(format!("{what} from model output: {preview:?}")))
}
