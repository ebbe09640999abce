//! Plain-text body extraction from a Gmail MIME tree

use std::collections::VecDeque;

use crate::gmail::types::MessagePart;
use crate::gmail::utils::{decode_base64url_string, decode_html_entities};

const TEXT_PLAIN: &str = "text/plain";

/// Find and decode the first plain-text body of a message.
///
/// A root part carrying inline data is returned as-is (decoded). Otherwise
/// the tree is searched breadth-first, so a shallower `text/plain` leaf wins
/// over a deeper one and siblings are taken in order.
pub fn extract_plain_text(payload: Option<&MessagePart>) -> Option<String> {
    let root = payload?;

    if let Some(text) = root.inline_data().and_then(decode_body) {
        return Some(text);
    }

    let mut queue: VecDeque<&MessagePart> = root.parts.iter().collect();
    while let Some(part) = queue.pop_front() {
        if part.mime_type.as_deref() == Some(TEXT_PLAIN) {
            if let Some(text) = part.inline_data().and_then(decode_body) {
                return Some(text);
            }
        }
        queue.extend(part.parts.iter());
    }

    None
}

fn decode_body(data: &str) -> Option<String> {
    match decode_base64url_string(data) {
        Ok(text) => Some(decode_html_entities(&text)),
        Err(e) => {
            tracing::debug!("Skipping undecodable body part: {}", e);
            None
        }
    }
}
