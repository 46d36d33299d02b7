//! OCLC Classify (XML).
//!
//! Only the first `<work>` element is read; its attributes carry the title,
//! the `|`-separated author headings and the latest holding year (`hyr`).

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, instrument};

use bibresolve_shared::{BibError, Record, RecordType, Result, parse_authors};

use super::{clean_name, clean_title, endpoint, isbn_key};
use crate::normalize::finalize;
use crate::transport::{HttpRequest, RequestExecutor};

pub(crate) const SOURCE: &str = "OCLC Classify";

pub struct OclcClassify {
    executor: Arc<dyn RequestExecutor>,
    base_url: String,
}

#[derive(Debug, Default, PartialEq)]
struct Work {
    title: String,
    author: String,
    hyr: String,
}

impl OclcClassify {
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self), fields(provider = "oclc"))]
    pub async fn lookup_isbn(&self, raw: &str) -> Result<Record> {
        let isbn = isbn_key(raw)?;
        let url = endpoint(&self.base_url, "", &[("isbn", &isbn), ("summary", "true")])?;
        let response = self
            .executor
            .execute(HttpRequest::get(url))
            .await?
            .error_for_status()?;

        let (code, work) = parse_classify(&response.body)?;
        debug!(?code, "classify response code");
        let work = work.ok_or_else(|| {
            BibError::EmptyResult(format!(
                "{SOURCE} found no work (response code {})",
                code.as_deref().unwrap_or("missing")
            ))
        })?;

        let mut record = Record::new(RecordType::Book, clean_title(&work.title));
        record.authors = parse_authors(
            work.author
                .split('|')
                .map(clean_name)
                .filter(|n| !n.is_empty()),
        );
        record.date = work.hyr;
        record.isbn = isbn;

        finalize(record, SOURCE)
    }
}

/// The `<response code=…>` value and the first `<work>` with a title.
fn parse_classify(xml: &[u8]) -> Result<(Option<String>, Option<Work>)> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut code = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"response" => code = attribute(&e, b"code")?,
                b"work" => {
                    let work = Work {
                        title: attribute(&e, b"title")?.unwrap_or_default(),
                        author: attribute(&e, b"author")?.unwrap_or_default(),
                        hyr: attribute(&e, b"hyr")?.unwrap_or_default(),
                    };
                    if !work.title.trim().is_empty() {
                        return Ok((code, Some(work)));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(BibError::decode(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok((code, None))
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| BibError::decode(format!("XML attribute error: {e}")))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| BibError::decode(format!("XML attribute error: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
