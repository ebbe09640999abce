//! Configuration management for the Gmail Assistant MCP server
//!
//! Settings are resolved once at startup from the process environment and an
//! optional `KEY=VALUE` file. The file only fills keys the environment leaves
//! unset; the process environment itself is never modified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Serialize;

use crate::error::{AuthError, ConfigError, GmailMcpError, Result};
use crate::gmail::auth::ClientCredentials;
use crate::gmail::utils::sanitize;

/// Environment keys
pub mod env {
    pub const CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
    pub const REDIRECT_URI: &str = "GOOGLE_REDIRECT_URI";
    pub const ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";
    pub const REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";
}

/// Google endpoint constants
pub mod google {
    /// OAuth 2.0 authorization endpoint
    pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// OAuth 2.0 token endpoint
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";
}

/// Remote endpoints used by the tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: google::AUTH_URL.to_string(),
            token_url: google::TOKEN_URL.to_string(),
            api_base_url: google::API_BASE_URL.to_string(),
        }
    }
}

/// Configuration for the Gmail Assistant MCP server
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// OAuth client ID
    pub client_id: Option<String>,

    /// OAuth client secret
    pub client_secret: Option<SecretString>,

    /// Redirect URI registered for the OAuth client
    pub redirect_uri: Option<String>,

    /// Fallback access token for Gmail calls
    pub access_token: Option<SecretString>,

    /// Fallback refresh token
    pub refresh_token: Option<SecretString>,

    /// Remote endpoints
    pub endpoints: Endpoints,
}

/// Which settings are present, without their values
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthEnvStatus {
    pub client_id: bool,
    pub client_secret: bool,
    pub access_token: bool,
    pub refresh_token: bool,
}

impl Config {
    /// Load configuration from the process environment, falling back to the
    /// given settings file for keys the environment does not define
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        let file_values = match env_file {
            Some(path) => read_env_file(path)?,
            None => HashMap::new(),
        };

        Ok(Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_values.get(key).cloned())
        }))
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).and_then(|v| sanitize(&v));

        Self {
            client_id: get(env::CLIENT_ID),
            client_secret: get(env::CLIENT_SECRET).map(SecretString::from),
            redirect_uri: get(env::REDIRECT_URI),
            access_token: get(env::ACCESS_TOKEN).map(SecretString::from),
            refresh_token: get(env::REFRESH_TOKEN).map(SecretString::from),
            endpoints: Endpoints::default(),
        }
    }

    /// Replace the remote endpoints
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Locate the default settings file: `./.env`, then the user config dir
    pub fn default_env_file() -> Option<PathBuf> {
        let local = PathBuf::from(".env");
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("gmail-assistant-mcp").join(".env"))
            .filter(|path| path.is_file())
    }

    /// OAuth client credentials, or an error naming what is missing
    pub fn client_credentials(&self) -> Result<ClientCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(ClientCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            (client_id, client_secret) => {
                let mut missing = Vec::new();
                if client_id.is_none() {
                    missing.push(env::CLIENT_ID);
                }
                if client_secret.is_none() {
                    missing.push(env::CLIENT_SECRET);
                }
                Err(GmailMcpError::Auth(AuthError::MissingClientCredentials {
                    missing: missing.join(" and "),
                }))
            }
        }
    }

    /// Presence of each credential setting
    pub fn auth_status(&self) -> AuthEnvStatus {
        AuthEnvStatus {
            client_id: self.client_id.is_some(),
            client_secret: self.client_secret.is_some(),
            access_token: self.access_token.is_some(),
            refresh_token: self.refresh_token.is_some(),
        }
    }
}

/// Read a `KEY=VALUE` file.
///
/// Blank lines and lines starting with `#` are ignored. The first `=` splits
/// key from value and both are trimmed; values are otherwise kept as written,
/// with no quoting, interpolation or inline comments. The first occurrence of
/// a key wins; lines without `=` are skipped.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        GmailMcpError::Config(ConfigError::EnvFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })?;

    let values = parse_env_lines(&contents, path);
    tracing::debug!("Loaded {} settings from {}", values.len(), path.display());
    Ok(values)
}

fn parse_env_lines(contents: &str, path: &Path) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                values
                    .entry(key.trim().to_string())
                    .or_insert_with(|| value.trim().to_string());
            }
            _ => {
                tracing::warn!("Skipping malformed line {} in {}", index + 1, path.display());
            }
        }
    }

    values
}
