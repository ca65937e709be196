use axum::http::HeaderValue;
use sanitize_filename::sanitize;

/// Name used when an upload arrives without a usable filename.
const FALLBACK_FILENAME: &str = "file";

/// Turns a client-supplied upload name into a safe display name.
///
/// Every run of whitespace (tabs and newlines included) becomes a single `_`,
/// then path separators and characters the filesystem rejects are stripped.
pub fn normalize_filename(original: &str) -> String {
    let mut collapsed = String::with_capacity(original.len());
    let mut in_whitespace = false;
    for ch in original.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                collapsed.push('_');
            }
            in_whitespace = true;
        } else {
            collapsed.push(ch);
            in_whitespace = false;
        }
    }

    let normalized = sanitize(&collapsed);

    if normalized.is_empty() || normalized.chars().all(|c| c == '.') {
        FALLBACK_FILENAME.to_string()
    } else {
        normalized
    }
}

/// Builds a `Content-Disposition: attachment` value for the given filename.
///
/// Carries an ASCII-only `filename` for old clients and an RFC 5987
/// `filename*` with the exact UTF-8 name.
pub fn attachment_disposition(filename: &str) -> HeaderValue {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    );

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
