//! Record validation, run once by every provider before a record is returned.

use chrono::{Datelike, Local};

use crate::error::{BibError, Result};
use crate::types::Record;

/// Earliest plausible publication year.
pub const MIN_YEAR: i32 = 1000;

/// Latest plausible publication year (next calendar year).
pub fn max_year() -> i32 {
    Local::now().year() + 1
}

/// Today's date as `YYYY-MM-DD`, used for `accessed`.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

impl Record {
    /// Check the canonical-schema invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(BibError::validation("record id is empty"));
        }

        if self.title.trim().is_empty() {
            return Err(BibError::validation("record title is empty"));
        }

        if let Some(author) = self.authors.iter().find(|a| a.family.trim().is_empty()) {
            return Err(BibError::validation(format!(
                "author without family name (given: {:?})",
                author.given
            )));
        }

        if let Some(year) = self.year {
            let max = max_year();
            if !(MIN_YEAR..=max).contains(&year) {
                return Err(BibError::validation(format!(
                    "year {year} outside {MIN_YEAR}..={max}"
                )));
            }
        }

        if !self.url.is_empty() && self.accessed.is_empty() {
            return Err(BibError::validation(format!(
                "url {} set without an accessed date",
                self.url
            )));
        }

        for kw in &self.annotation.keywords {
            if kw.is_empty() || kw.trim() != kw || kw.to_lowercase() != *kw {
                return Err(BibError::validation(format!(
                    "keyword {kw:?} is not trimmed lowercase"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, RecordType};

    fn valid() -> Record {
        let mut record = Record::new(RecordType::Book, "Dune");
        record.id = "herbert-1965-dune".into();
        record.year = Some(1965);
        record.authors.push(Author::parse("Frank Herbert").unwrap());
        record
    }

    #[test]
    fn accepts_valid_record() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_blank_title_and_id() {
        let mut r = valid();
        r.title = "   ".into();
        assert!(r.validate().is_err());

        let mut r = valid();
        r.id.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn rejects_implausible_year() {
        let mut r = valid();
        r.year = Some(999);
        assert!(r.validate().is_err());

        r.year = Some(max_year() + 1);
        assert!(r.validate().is_err());

        r.year = Some(max_year());
        assert!(r.validate().is_ok());
    }

    #[test]
    fn url_requires_accessed() {
        let mut r = valid();
        r.url = "https://example.org".into();
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("accessed"));

        r.accessed = today();
        assert!(r.validate().is_ok());
    }

    #[test]
    fn rejects_uppercase_keyword() {
        let mut r = valid();
        r.annotation.keywords.insert("Sci-Fi".into());
        assert!(r.validate().is_err());
    }
}
