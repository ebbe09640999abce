//! Error types for the Gmail Assistant MCP server
//!
//! Every failure a tool call can hit maps onto one of these variants. The
//! dispatcher turns them into failure envelopes, so none of them ever reach
//! the host as a protocol error.

use thiserror::Error;

/// Main error type for the Gmail Assistant MCP server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// Missing OAuth client credentials or bearer tokens
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success responses from Gmail or the OAuth token endpoint
    #[error("Gmail API error: {0}")]
    Gmail(#[from] GmailApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool argument errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// How to obtain tokens, appended to every missing-token message.
pub const TOKEN_HELP: &str = "To obtain tokens: call gmail_get_auth_url, open the URL and approve access, \
then pass the returned code to gmail_exchange_code. When you already hold a refresh token, \
call gmail_refresh_access_token instead.";

/// Credential errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing OAuth client credentials. Add {missing} to the environment or the .env file")]
    MissingClientCredentials { missing: String },

    #[error("No access token available. Pass accessToken or set GOOGLE_ACCESS_TOKEN. {}", TOKEN_HELP)]
    MissingAccessToken,

    #[error("No refresh token available. Pass refreshToken or set GOOGLE_REFRESH_TOKEN. {}", TOKEN_HELP)]
    MissingRefreshToken,
}

/// Remote API errors
#[derive(Error, Debug)]
pub enum GmailApiError {
    #[error("{message} (HTTP {status})")]
    RequestFailed { status: u16, message: String },

    #[error("Original message has no {header} header")]
    MissingHeader { header: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {message}")]
    EnvFile { path: String, message: String },
}

/// Argument errors, raised before any network call
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool parameters: {message}")]
    InvalidParams { message: String },
}

/// Result type alias for Gmail MCP operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;
