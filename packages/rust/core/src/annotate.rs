//! Keyword and summary enrichment through a generative text capability.
//!
//! Model replies go through the `bibresolve_textparse` ladders; a reply that
//! cannot be recovered never fails the annotation, it just contributes less.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use bibresolve_providers::{TextCompletion, has_default_summary};
use bibresolve_shared::{Record, Result};
use bibresolve_textparse::{parse_keywords, parse_object};

const KEYWORD_SYSTEM: &str = "You are a librarian assigning subject keywords to bibliographic \
records. Reply with a JSON array of 3 to 8 short lowercase keywords and nothing else.";

const SUMMARY_SYSTEM: &str = "You are a librarian writing one-paragraph annotations for a \
bibliography. Reply with a JSON object of the form {\"summary\": \"...\"} and nothing else.";

#[derive(Debug, Deserialize)]
struct SummaryReply {
    summary: String,
}

pub struct Annotator {
    completion: Arc<dyn TextCompletion>,
}

impl Annotator {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    /// Return an annotated copy of `record`.
    ///
    /// Completion failures propagate. Unparseable replies fall back to the
    /// record-type keyword and keep the existing summary.
    #[instrument(skip_all, fields(id = %record.id))]
    pub async fn annotate(&self, record: &Record) -> Result<Record> {
        let mut annotated = record.clone();
        let description = describe(record);

        let reply = self.completion.complete(KEYWORD_SYSTEM, &description).await?;
        match parse_keywords(&reply) {
            Ok(keywords) => {
                debug!(count = keywords.len(), "keywords parsed");
                annotated.annotation.add_keywords(&keywords);
            }
            Err(e) => {
                warn!(error = %e, "keyword reply unusable, using record type");
                annotated.annotation.add_keywords([record.kind.as_str()]);
            }
        }

        if has_default_summary(record) {
            let reply = self.completion.complete(SUMMARY_SYSTEM, &description).await?;
            match parse_object::<SummaryReply>(&reply) {
                Ok(SummaryReply { summary }) if !summary.trim().is_empty() => {
                    annotated.annotation.summary =
                        summary.split_whitespace().collect::<Vec<_>>().join(" ");
                }
                Ok(_) => warn!("summary reply was blank, keeping default"),
                Err(e) => warn!(error = %e, "summary reply unusable, keeping default"),
            }
        }

        annotated.validate()?;
        info!(keywords = annotated.annotation.keywords.len(), "record annotated");
        Ok(annotated)
    }
}

/// Plain-text rendering of the record used as the user prompt.
fn describe(record: &Record) -> String {
    let mut lines = vec![
        format!("Type: {}", record.kind),
        format!("Title: {}", record.title),
    ];

    if !record.authors.is_empty() {
        let names: Vec<String> = record
            .authors
            .iter()
            .map(|a| match &a.given {
                Some(given) => format!("{given} {}", a.family),
                None => a.family.clone(),
            })
            .collect();
        lines.push(format!("Authors: {}", names.join("; ")));
    }
    if let Some(year) = record.year {
        lines.push(format!("Year: {year}"));
    }
    for (label, value) in [
        ("Published in", &record.container_title),
        ("Journal", &record.journal),
        ("Publisher", &record.publisher),
    ] {
        if !value.is_empty() {
            lines.push(format!("{label}: {value}"));
        }
    }
    if !has_default_summary(record) && !record.annotation.summary.is_empty() {
        lines.push(format!("Summary: {}", record.annotation.summary));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bibresolve_providers::default_summary;
    use bibresolve_shared::{Author, BibError, RecordType};

    use super::*;

    /// Replies with a canned answer per system prompt and records the prompts.
    struct StubCompletion {
        keywords: String,
        summary: String,
        prompts: Mutex<Vec<String>>,
    }

    impl StubCompletion {
        fn new(keywords: &str, summary: &str) -> Arc<Self> {
            Arc::new(Self {
                keywords: keywords.into(),
                summary: summary.into(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextCompletion for StubCompletion {
        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            if system == KEYWORD_SYSTEM {
                Ok(self.keywords.clone())
            } else {
                Ok(self.summary.clone())
            }
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl TextCompletion for FailingCompletion {
        async fn complete(&self, _: &str, _: &str) -> Result<String> {
            Err(BibError::Completion("HTTP 401".into()))
        }
    }

    fn record() -> Record {
        let mut record = Record::new(RecordType::Book, "Dune");
        record.id = "herbert-1965-dune".into();
        record.year = Some(1965);
        record.authors.push(Author::parse("Frank Herbert").unwrap());
        record.annotation.summary = default_summary("Dune", "Open Library");
        record.annotation.add_keywords(["Fiction"]);
        record
    }

    #[tokio::test]
    async fn merges_keywords_and_replaces_default_summary() {
        let stub = StubCompletion::new(
            "Sure! Here you go: [\"Science Fiction\", \"Ecology\"]",
            "```json\n{\"summary\": \"A desert planet saga.\"}\n```",
        );
        let annotated = Annotator::new(stub.clone()).annotate(&record()).await.unwrap();

        let keywords: Vec<&str> =
            annotated.annotation.keywords.iter().map(String::as_str).collect();
        assert_eq!(keywords, vec!["ecology", "fiction", "science fiction"]);
        assert_eq!(annotated.annotation.summary, "A desert planet saga.");
        assert_eq!(annotated.id, "herbert-1965-dune");

        let prompts = stub.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Title: Dune"));
        assert!(prompts[0].contains("Authors: Frank Herbert"));
    }

    #[tokio::test]
    async fn unparseable_keywords_fall_back_to_type() {
        let stub = StubCompletion::new("[]", "no idea");
        let mut input = record();
        input.annotation.keywords.clear();

        let annotated = Annotator::new(stub).annotate(&input).await.unwrap();
        let keywords: Vec<&str> =
            annotated.annotation.keywords.iter().map(String::as_str).collect();
        assert_eq!(keywords, vec!["book"]);
        // summary reply had no object, default kept
        assert_eq!(annotated.annotation.summary, input.annotation.summary);
    }

    #[tokio::test]
    async fn custom_summary_is_not_requested() {
        let stub = StubCompletion::new("space, politics", "{\"summary\": \"unused\"}");
        let mut input = record();
        input.annotation.summary = "A novel about spice.".into();

        let annotated = Annotator::new(stub.clone()).annotate(&input).await.unwrap();
        assert_eq!(annotated.annotation.summary, "A novel about spice.");
        assert!(annotated.annotation.keywords.contains("politics"));
        assert_eq!(stub.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completion_failure_propagates() {
        let err = Annotator::new(Arc::new(FailingCompletion))
            .annotate(&record())
            .await
            .unwrap_err();
        assert!(matches!(err, BibError::Completion(_)));
    }
}
