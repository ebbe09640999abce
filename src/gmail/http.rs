//! JSON request helper shared by the Gmail and OAuth calls

use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};

use crate::error::{GmailApiError, GmailMcpError, Result};

/// Send one request and return its body as JSON.
///
/// A body that is not JSON comes back as `{"raw": <text>}`. Non-success
/// statuses become [`GmailApiError::RequestFailed`] carrying the remote
/// error message.
pub async fn send_json(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let body = parse_body(text);

    if !status.is_success() {
        let message = remote_error_message(&body, status);
        tracing::debug!(status = status.as_u16(), "Remote call failed: {}", message);
        return Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
            status: status.as_u16(),
            message,
        }));
    }

    Ok(body)
}

fn parse_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => json!({ "raw": text }),
    }
}

/// Pull a human-readable message out of a Google error envelope
fn remote_error_message(body: &Value, status: StatusCode) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error_description").and_then(Value::as_str))
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}
