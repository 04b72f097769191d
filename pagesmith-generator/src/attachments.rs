//! `data:` URI handling for task attachments.
//!
//! Only textual media types are inlined into the artifact set; everything
//! else stays a link in the generated page.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub media_type: String,
    pub body: Vec<u8>,
}

/// Parse `data:[<media type>][;base64],<data>`.
///
/// Returns `None` for non-`data:` URIs, malformed base64, and plain payloads
/// that use percent-encoding.
pub fn parse_data_uri(uri: &str) -> Option<DataUri> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;

    let mut params = meta.split(';');
    let media_type = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_ascii_lowercase();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let body = if is_base64 {
        STANDARD.decode(data.trim()).ok()?
    } else if data.contains('%') {
        return None;
    } else {
        data.as_bytes().to_vec()
    };

    Some(DataUri { media_type, body })
}

/// Media types whose bodies are published as text files.
pub fn is_textual(media_type: &str) -> bool {
    media_type.starts_with("text/")
        || matches!(
            media_type,
            "application/json"
                | "application/xml"
                | "application/javascript"
                | "application/x-javascript"
                | "image/svg+xml"
        )
}

/// Decode an attachment to UTF-8 text when it is an inlinable `data:` URI.
pub fn inline_text(uri: &str) -> Option<String> {
    let parsed = parse_data_uri(uri)?;
    if !is_textual(&parsed.media_type) {
        return None;
    }
    String::from_utf8(parsed.body).ok()
}

/// Reduce an attachment name to a single safe path segment.
pub fn sanitize_name(name: &str) -> Option<String> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
