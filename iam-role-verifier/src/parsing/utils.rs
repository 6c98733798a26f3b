//! Query-string unescaping for IAM policy documents.

use crate::error::{VerifierError, VerifierResult};

/// Returns the first malformed `%` escape in `value`, if any.
///
/// A well-formed escape is `%` followed by exactly two hex digits.
pub fn find_invalid_escape(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Some(value.get(i..end).unwrap_or(&value[i..]));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    None
}

/// Decode a query-escaped string: `+` becomes a space and `%XX` becomes the
/// byte `XX`. Malformed escapes and non-UTF-8 output are errors.
pub fn query_unescape(value: &str) -> VerifierResult<String> {
    if let Some(escape) = find_invalid_escape(value) {
        return Err(VerifierError::decode(format!(
            "invalid URL escape \"{escape}\""
        )));
    }
    let spaced = value.replace('+', "%20");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| VerifierError::decode(format!("decoded document is not UTF-8: {e}")))
}
