//! ISBN normalization and check-digit helpers.
//!
//! Everything here is pure. Providers decide for themselves whether they want
//! the ISBN-10 or ISBN-13 form of a key.

/// Strip whitespace and hyphens. A bare 9-digit body gets its ISBN-10 check
/// digit appended; anything else is returned cleaned but otherwise unchanged.
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if cleaned.len() == 9 && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        let check = check_digit10(&cleaned);
        return format!("{cleaned}{check}");
    }

    cleaned
}

/// Weighted-sum-mod-11 check digit over the first nine digits of an ISBN-10.
///
/// Non-digit characters are skipped, so callers should pass a cleaned string.
pub fn check_digit10(first9: &str) -> char {
    let sum: u32 = first9
        .chars()
        .filter_map(|c| c.to_digit(10))
        .take(9)
        .zip((2..=10).rev())
        .map(|(d, w)| d * w)
        .sum();

    match 11 - (sum % 11) {
        10 => 'X',
        11 => '0',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

/// Mod-10 check digit (alternating weights 1 and 3) over the first twelve digits.
pub fn check_digit13(first12: &str) -> char {
    let sum: u32 = first12
        .chars()
        .filter_map(|c| c.to_digit(10))
        .take(12)
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();

    char::from_digit((10 - (sum % 10)) % 10, 10).unwrap_or('0')
}

/// True for a well-formed ISBN-10 or ISBN-13 whose check digit recomputes.
pub fn is_valid(isbn: &str) -> bool {
    let isbn = normalize(isbn);
    if !is_isbn_charset(&isbn) {
        return false;
    }
    match isbn.len() {
        10 => {
            let (body, check) = isbn.split_at(9);
            body.bytes().all(|b| b.is_ascii_digit())
                && check.eq_ignore_ascii_case(&check_digit10(body).to_string())
        }
        13 => {
            let (body, check) = isbn.split_at(12);
            isbn.bytes().all(|b| b.is_ascii_digit()) && check == check_digit13(body).to_string()
        }
        _ => false,
    }
}

/// Convert an ISBN-10 to its `978`-prefixed ISBN-13 form. ISBN-13 input is
/// returned as is; anything else yields `None`.
pub fn to_isbn13(isbn: &str) -> Option<String> {
    let isbn = normalize(isbn);
    match isbn.len() {
        13 if isbn.bytes().all(|b| b.is_ascii_digit()) => Some(isbn),
        10 if is_isbn_charset(&isbn) => {
            let body = format!("978{}", &isbn[..9]);
            if !body.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let check = check_digit13(&body);
            Some(format!("{body}{check}"))
        }
        _ => None,
    }
}

/// Convert a `978`-prefixed ISBN-13 to ISBN-10. ISBN-10 input is returned as is.
pub fn to_isbn10(isbn: &str) -> Option<String> {
    let isbn = normalize(isbn);
    match isbn.len() {
        10 if is_isbn_charset(&isbn) => Some(isbn),
        13 if isbn.starts_with("978") && isbn.bytes().all(|b| b.is_ascii_digit()) => {
            let body = &isbn[3..12];
            Some(format!("{body}{}", check_digit10(body)))
        }
        _ => None,
    }
}

/// True when the normalized identifier contains only ISBN characters.
pub fn is_isbn_charset(isbn: &str) -> bool {
    !isbn.is_empty()
        && isbn
            .chars()
            .all(|c| c.is_ascii_digit() || c == 'X' || c == 'x')
}
