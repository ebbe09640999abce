//! Threaded reply composition
//!
//! Derives the reply headers from the original message and renders the
//! RFC 2822 text Gmail ingests as a draft's `raw` field.

use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::types::MessagePart;
use crate::gmail::utils::{encode_mime_header, find_header};

/// Headers requested when fetching the original message
pub const ORIGINAL_HEADERS: &[&str] = &["From", "Reply-To", "Subject", "Message-ID", "References"];

/// A plain-text reply ready to be serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeaders {
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub body: String,
}

impl ReplyHeaders {
    /// Build a reply to the message whose top-level part is `original`
    pub fn from_original(original: &MessagePart, body: impl Into<String>) -> Result<Self> {
        let header = |name: &str| {
            find_header(original, name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let to = header("Reply-To").or_else(|| header("From")).ok_or_else(|| {
            GmailMcpError::Gmail(GmailApiError::MissingHeader {
                header: "From".to_string(),
            })
        })?;
        let message_id = header("Message-ID");

        Ok(Self {
            to: to.to_string(),
            subject: reply_subject(header("Subject").unwrap_or("")),
            in_reply_to: message_id.map(str::to_string),
            references: chain_references(header("References"), message_id),
            body: body.into(),
        })
    }

    /// Render as CRLF-delimited RFC 2822 text
    pub fn to_rfc2822(&self) -> String {
        let mut lines = vec![
            format!("To: {}", self.to),
            "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
            "MIME-Version: 1.0".to_string(),
            format!("Subject: {}", encode_mime_header(&self.subject)),
        ];

        if let Some(ref in_reply_to) = self.in_reply_to {
            lines.push(format!("In-Reply-To: {}", in_reply_to));
        }
        if let Some(ref references) = self.references {
            lines.push(format!("References: {}", references));
        }

        lines.push(String::new());
        lines.push(self.body.clone());

        lines.join("\r\n")
    }
}

/// Prefix "Re: " unless the subject already starts with it (any case)
pub fn reply_subject(subject: &str) -> String {
    let already_reply = subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));

    if already_reply {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

/// Append the original Message-ID to its References chain
pub fn chain_references(references: Option<&str>, message_id: Option<&str>) -> Option<String> {
    let chain: Vec<&str> = [references, message_id]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if chain.is_empty() {
        None
    } else {
        Some(chain.join(" "))
    }
}
