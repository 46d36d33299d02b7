//! Minimal PDF info-dictionary scanner.
//!
//! This is a token scanner, not an object-graph parser: it follows the
//! trailer's `/Info n g R` reference when it can, and scans the whole file for
//! any key that object does not carry. Compressed object streams are not
//! inflated, so documents that keep their info dictionary inside one yield
//! empty fields.

use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::debug;

use bibresolve_shared::{BibError, Result};

/// Fields read from the document information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creation_date: Option<String>,
}

static INFO_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Info\s+(\d+)\s+(\d+)\s+R").expect("info ref regex"));

/// How far into the file the `%PDF-` header may appear.
const HEADER_WINDOW: usize = 1024;

/// Parse the info dictionary of a PDF byte stream.
pub fn parse_pdf_info(bytes: &[u8]) -> Result<PdfInfo> {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    if find(window, b"%PDF-", 0).is_none() {
        return Err(BibError::decode("not a PDF document (missing %PDF- header)"));
    }

    // Keys missing from the referenced object are looked up file-wide.
    let region = info_region(bytes);
    let lookup = |key: &[u8]| {
        region
            .and_then(|r| read_key(r, key))
            .or_else(|| read_key(bytes, key))
    };

    Ok(PdfInfo {
        title: lookup(b"/Title"),
        author: lookup(b"/Author"),
        creation_date: lookup(b"/CreationDate"),
    })
}

/// Bytes of the object the last trailer's `/Info` points at.
fn info_region(bytes: &[u8]) -> Option<&[u8]> {
    let caps = INFO_REF_RE.captures_iter(bytes).last()?;
    let num = std::str::from_utf8(&caps[1]).ok()?;
    let gen_ = std::str::from_utf8(&caps[2]).ok()?;

    let header = Regex::new(&format!(r"(?:^|[^0-9]){num}\s+{gen_}\s+obj")).ok()?;
    let start = header.find(bytes)?.end();
    let end = find(bytes, b"endobj", start).unwrap_or(bytes.len());

    debug!(object = num, "located PDF info dictionary");
    Some(&bytes[start..end])
}

/// Value of `key` as a decoded string, if the key is followed by a string token.
fn read_key(region: &[u8], key: &[u8]) -> Option<String> {
    let mut from = 0;
    while let Some(at) = find(region, key, from) {
        let mut pos = at + key.len();
        from = pos;

        // `/Title` must not match `/TitleFoo`.
        if region.get(pos).is_some_and(|b| b.is_ascii_alphanumeric()) {
            continue;
        }
        while region.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }

        let raw = match region.get(pos) {
            Some(b'(') => literal_string(&region[pos + 1..]),
            Some(b'<') if region.get(pos + 1) != Some(&b'<') => hex_string(&region[pos + 1..]),
            _ => continue,
        };

        let text = decode_text(&raw);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Body of a `(…)` literal with nesting and escapes resolved.
fn literal_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\\' => {
                i += 1;
                let Some(&next) = bytes.get(i) else { break };
                match next {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'(' | b')' | b'\\' => out.push(next),
                    b'\r' | b'\n' => {
                        // line continuation
                        if next == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'0'..=b'7' => {
                        let mut value: u32 = 0;
                        let mut taken = 0;
                        while taken < 3 {
                            match bytes.get(i + taken) {
                                Some(d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    taken += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xff) as u8);
                        i += taken - 1;
                    }
                    other => out.push(other),
                }
            }
            b'(' => {
                depth += 1;
                out.push(b);
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                out.push(b);
            }
            _ => out.push(b),
        }
        i += 1;
    }

    out
}

/// Body of a `<…>` hex string; whitespace ignored, odd length padded with 0.
fn hex_string(bytes: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = bytes
        .iter()
        .take_while(|&&b| b != b'>')
        .filter_map(|&b| (b as char).to_digit(16).map(|d| d as u8))
        .collect();

    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

/// UTF-16BE when BOM-prefixed, UTF-8 when valid, else Latin-1.
fn decode_text(raw: &[u8]) -> String {
    if let Some(body) = raw.strip_prefix(&[0xfe, 0xff]) {
        let units: Vec<u16> = body
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], c.get(1).copied().unwrap_or(0)]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf() -> Vec<u8> {
        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        pdf.extend_from_slice(b"4 0 obj\n<< /Title (Outline entry) >>\nendobj\n");
        pdf.extend_from_slice(
            b"12 0 obj\n<< /Title (Parsing \\(Really\\) Fast) /Author (Doe, Jane)\n\
              /CreationDate (D:20190304120000Z) /Producer (x) >>\nendobj\n",
        );
        pdf.extend_from_slice(b"trailer\n<< /Size 13 /Root 1 0 R /Info 12 0 R >>\n%%EOF\n");
        pdf
    }

    #[test]
    fn follows_trailer_info_reference() {
        let info = parse_pdf_info(&sample_pdf()).unwrap();
        assert_eq!(info.title.as_deref(), Some("Parsing (Really) Fast"));
        assert_eq!(info.author.as_deref(), Some("Doe, Jane"));
        assert_eq!(info.creation_date.as_deref(), Some("D:20190304120000Z"));
    }

    #[test]
    fn falls_back_to_first_title_without_trailer() {
        let pdf = b"%PDF-1.3\n3 0 obj << /Title (A \\\\ B) >> endobj";
        let info = parse_pdf_info(pdf).unwrap();
        assert_eq!(info.title.as_deref(), Some("A \\ B"));
        assert!(info.author.is_none());
    }

    #[test]
    fn missing_info_keys_are_scanned_file_wide() {
        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.5\n");
        pdf.extend_from_slice(b"7 0 obj\n<< /Title (Loose Title) >>\nendobj\n");
        pdf.extend_from_slice(b"9 0 obj\n<< /Author (Roe, Jane) /Producer (x) >>\nendobj\n");
        pdf.extend_from_slice(b"trailer\n<< /Size 10 /Info 9 0 R >>\n%%EOF\n");

        let info = parse_pdf_info(&pdf).unwrap();
        assert_eq!(info.title.as_deref(), Some("Loose Title"));
        assert_eq!(info.author.as_deref(), Some("Roe, Jane"));
        assert!(info.creation_date.is_none());
    }

    #[test]
    fn hex_and_utf16_strings() {
        // "Hi" as UTF-16BE with BOM
        let pdf = b"%PDF-1.7\n1 0 obj << /Title <FEFF00480069> /Author <4A6F65> >> endobj";
        let info = parse_pdf_info(pdf).unwrap();
        assert_eq!(info.title.as_deref(), Some("Hi"));
        assert_eq!(info.author.as_deref(), Some("Joe"));
    }

    #[test]
    fn nested_parens_and_octal() {
        assert_eq!(literal_string(b"a (b) c) tail"), b"a (b) c".to_vec());
        assert_eq!(literal_string(b"caf\\351)"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(decode_text(&literal_string(b"caf\\351)")), "café");
    }

    #[test]
    fn rejects_non_pdf() {
        assert!(parse_pdf_info(b"<html></html>").is_err());
    }
}
