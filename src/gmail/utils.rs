//! Gmail utility functions
//!
//! Argument sanitizing, base64url and HTML-entity decoding, and header helpers.

use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use regex::{Captures, Regex};

use crate::error::{GmailMcpError, Result, ValidationError};
use crate::gmail::types::MessagePart;

/// Trim a free-form string; blank input counts as absent
pub fn sanitize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Sanitize an optional argument
pub fn sanitize_opt(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(sanitize)
}

/// Sanitize a required argument, failing with the argument's name when blank
pub fn require(field: &str, value: Option<String>) -> Result<String> {
    sanitize_opt(value).ok_or_else(|| {
        GmailMcpError::Validation(ValidationError::MissingField {
            field: field.to_string(),
        })
    })
}

/// Encode text for MIME header (RFC 2047)
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Encode text as base64url without padding, as Gmail expects for `raw`
pub fn encode_base64url(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from Gmail API
/// Handles both padded and non-padded base64url encoding
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| {
            GmailMcpError::Validation(ValidationError::InvalidArguments {
                message: format!("invalid base64 data: {}", e),
            })
        })
}

/// Decode base64url data to text. Invalid UTF-8 sequences are replaced.
pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|(amp|lt|gt|quot|apos|nbsp));")
            .expect("entity pattern is a valid regex")
    })
}

/// Decode the HTML entities Gmail leaves in text bodies and snippets.
///
/// Covers `&amp; &lt; &gt; &quot; &apos; &nbsp;` plus decimal and hex
/// character references, in a single pass. Anything else, including
/// references to invalid code points, is left as written.
pub fn decode_html_entities(input: &str) -> String {
    entity_pattern()
        .replace_all(input, |caps: &Captures| {
            let decoded = if let Some(decimal) = caps.get(1) {
                decimal.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("amp") => Some('&'),
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("nbsp") => Some(' '),
                    _ => None,
                }
            };

            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}
