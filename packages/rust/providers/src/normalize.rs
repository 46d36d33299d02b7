//! Final pass every adapter runs before returning a record.

use tracing::debug;

use bibresolve_shared::{
    BibError, MIN_YEAR, Record, Result, generate_id, max_year, today, year_from_date,
};

/// The summary used when a source supplies no description.
pub fn default_summary(title: &str, source: &str) -> String {
    format!("Bibliographic record for {title} from {source}.")
}

/// True when the record still carries the templated summary for its title.
pub fn has_default_summary(record: &Record) -> bool {
    let prefix = format!("Bibliographic record for {} from ", record.title);
    record
        .annotation
        .summary
        .strip_prefix(&prefix)
        .is_some_and(|rest| rest.ends_with('.') && !rest.contains('\n'))
}

/// Fill defaults, derive `id`/`year`, and validate.
///
/// A title that is blank after trimming is an empty result, not a
/// validation failure: the source answered but had nothing usable.
pub(crate) fn finalize(mut record: Record, source: &str) -> Result<Record> {
    record.title = collapse(&record.title);
    if record.title.is_empty() {
        return Err(BibError::EmptyResult(format!(
            "{source} returned an entry without a title"
        )));
    }

    if record.year.is_none() {
        record.year = year_from_date(&record.date);
    }
    if let Some(year) = record.year {
        if !(MIN_YEAR..=max_year()).contains(&year) {
            debug!(year, source, "dropping implausible year");
            record.year = None;
        }
    }

    let summary = record.annotation.summary.trim().to_string();
    record.annotation.summary = if summary.is_empty() {
        default_summary(&record.title, source)
    } else {
        summary
    };

    if record.annotation.keywords.is_empty() {
        record.annotation.add_keywords([record.kind.as_str()]);
    }

    if record.id.is_empty() {
        record.id = generate_id(&record.authors, record.year, &record.title);
    }

    if !record.url.is_empty() && record.accessed.is_empty() {
        record.accessed = today();
    }

    record.validate()?;
    Ok(record)
}

/// Collapse whitespace runs and trim.
pub(crate) fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
