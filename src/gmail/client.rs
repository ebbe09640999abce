//! Gmail API client
//!
//! The three REST calls the tools need: list unread ids, fetch a message,
//! create a draft. Calls are issued one at a time, in order.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::gmail::http::send_json;
use crate::gmail::mime::extract_plain_text;
use crate::gmail::reply::{ReplyHeaders, ORIGINAL_HEADERS};
use crate::gmail::types::*;
use crate::gmail::utils::{decode_html_entities, encode_base64url, find_header};

/// Gmail search query for unread mail
const UNREAD_QUERY: &str = "is:unread";

/// How much of a message to fetch
#[derive(Debug, Clone, Copy)]
pub enum MessageFormat<'a> {
    /// Headers and the full MIME tree
    Full,
    /// Only the listed headers
    Metadata(&'a [&'a str]),
}

/// Gmail API client
#[derive(Debug, Clone)]
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// API base URL, without trailing slash
    base_url: String,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(http_client: reqwest::Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL for messages
    fn messages_url(&self, user_id: &str) -> String {
        format!("{}/users/{}/messages", self.base_url, urlencoding::encode(user_id))
    }

    /// Base URL for drafts
    fn drafts_url(&self, user_id: &str) -> String {
        format!("{}/users/{}/drafts", self.base_url, urlencoding::encode(user_id))
    }

    /// List the ids of unread messages, at most `max_results` of them
    pub async fn list_unread(
        &self,
        token: &SecretString,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>> {
        let max = max_results.to_string();
        let request = self
            .http_client
            .get(self.messages_url(user_id))
            .bearer_auth(token.expose_secret())
            .query(&[("q", UNREAD_QUERY), ("maxResults", max.as_str())]);

        let body = send_json(request).await?;
        let list: MessageList = serde_json::from_value(body)?;

        Ok(list
            .messages
            .into_iter()
            .take(max_results as usize)
            .collect())
    }

    /// Get a message by ID
    pub async fn get_message(
        &self,
        token: &SecretString,
        user_id: &str,
        message_id: &str,
        format: MessageFormat<'_>,
    ) -> Result<Message> {
        let url = format!(
            "{}/{}",
            self.messages_url(user_id),
            urlencoding::encode(message_id)
        );

        let mut query = Vec::new();
        match format {
            MessageFormat::Full => query.push(("format", "full")),
            MessageFormat::Metadata(headers) => {
                query.push(("format", "metadata"));
                query.extend(headers.iter().map(|h| ("metadataHeaders", *h)));
            }
        }

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(token.expose_secret())
            .query(&query);

        let body = send_json(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetch every unread message in list order.
    ///
    /// A failed detail fetch fails the whole call; messages fetched before
    /// it are discarded.
    pub async fn unread_emails(
        &self,
        token: &SecretString,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<UnreadEmail>> {
        let refs = self.list_unread(token, user_id, max_results).await?;
        tracing::debug!("Fetching {} unread messages", refs.len());

        let mut emails = Vec::with_capacity(refs.len());
        for msg_ref in refs {
            let message = self
                .get_message(token, user_id, &msg_ref.id, MessageFormat::Full)
                .await?;
            emails.push(UnreadEmail::from_message(message));
        }

        Ok(emails)
    }

    /// Create a draft replying to `message_id`, in the same thread
    pub async fn create_draft_reply(
        &self,
        token: &SecretString,
        user_id: &str,
        message_id: &str,
        body: &str,
    ) -> Result<Value> {
        let original = self
            .get_message(
                token,
                user_id,
                message_id,
                MessageFormat::Metadata(ORIGINAL_HEADERS),
            )
            .await?;

        let headers = original.payload.unwrap_or_default();
        let reply = ReplyHeaders::from_original(&headers, body)?;

        let request = CreateDraftRequest {
            message: SendMessageRequest {
                raw: encode_base64url(&reply.to_rfc2822()),
                thread_id: original.thread_id,
            },
        };

        tracing::info!(to = %reply.to, "Creating draft reply to {}", message_id);

        send_json(
            self.http_client
                .post(self.drafts_url(user_id))
                .bearer_auth(token.expose_secret())
                .json(&request),
        )
        .await
    }
}

/// One entry of the unread listing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnreadEmail {
    pub id: String,
    pub thread_id: Option<String>,
    pub from: String,
    pub subject: String,
    pub snippet: String,
    pub body: Option<String>,
}

impl UnreadEmail {
    /// Reduce a full-format message to the fields callers see
    pub fn from_message(message: Message) -> Self {
        let payload = message.payload.as_ref();
        let header = |name: &str| {
            payload
                .and_then(|p| find_header(p, name))
                .unwrap_or("")
                .to_string()
        };

        Self {
            from: header("From"),
            subject: header("Subject"),
            snippet: message
                .snippet
                .as_deref()
                .map(decode_html_entities)
                .unwrap_or_default(),
            body: extract_plain_text(payload),
            id: message.id,
            thread_id: message.thread_id,
        }
    }
}
