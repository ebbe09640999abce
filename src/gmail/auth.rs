//! OAuth 2.0 helpers for Gmail
//!
//! Builds the authorization URL and performs the two token-endpoint
//! exchanges:
//! - authorization code for access/refresh tokens
//! - refresh token for a fresh access token
//!
//! The browser redirect itself is left to the caller. Token responses are
//! returned untouched; nothing is stored.

use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Endpoints;
use crate::error::Result;
use crate::gmail::http::send_json;

/// Scope requested when the caller names none
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// OAuth client credentials
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: SecretString,
}

/// Whether Google should issue a refresh token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Online,
    #[default]
    Offline,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::Online => "online",
            AccessType::Offline => "offline",
        }
    }
}

/// Consent screen behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    Consent,
    #[serde(rename = "none")]
    NoPrompt,
    SelectAccount,
}

impl Prompt {
    pub fn as_str(self) -> &'static str {
        match self {
            Prompt::Consent => "consent",
            Prompt::NoPrompt => "none",
            Prompt::SelectAccount => "select_account",
        }
    }
}

/// Parameters of an authorization URL
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    pub redirect_uri: &'a str,
    pub scopes: &'a [String],
    pub access_type: AccessType,
    pub prompt: Option<Prompt>,
}

/// OAuth flow bound to one client registration
pub struct OAuthFlow<'a> {
    client: &'a reqwest::Client,
    endpoints: &'a Endpoints,
    credentials: &'a ClientCredentials,
}

impl<'a> OAuthFlow<'a> {
    /// Create a new OAuth flow
    pub fn new(
        client: &'a reqwest::Client,
        endpoints: &'a Endpoints,
        credentials: &'a ClientCredentials,
    ) -> Self {
        Self {
            client,
            endpoints,
            credentials,
        }
    }

    /// Generate the authorization URL
    pub fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> String {
        let scopes = if request.scopes.is_empty() {
            DEFAULT_SCOPE.to_string()
        } else {
            request.scopes.join(" ")
        };

        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(request.redirect_uri),
            urlencoding::encode(&scopes),
            request.access_type.as_str()
        );

        if let Some(prompt) = request.prompt {
            url.push_str("&prompt=");
            url.push_str(prompt.as_str());
        }

        url
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Value> {
        let params = [
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        tracing::info!("Exchanging authorization code for tokens");
        send_json(self.client.post(&self.endpoints.token_url).form(&params)).await
    }

    /// Refresh the access token using the refresh token
    pub async fn refresh_access_token(&self, refresh_token: &SecretString) -> Result<Value> {
        let params = [
            ("refresh_token", refresh_token.expose_secret()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        tracing::info!("Refreshing access token");
        send_json(self.client.post(&self.endpoints.token_url).form(&params)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "client id".to_string(),
            client_secret: SecretString::from("secret".to_string()),
        }
    }

    #[test]
    fn test_authorization_url_defaults() {
        let client = reqwest::Client::new();
        let endpoints = Endpoints::default();
        let creds = credentials();
        let flow = OAuthFlow::new(&client, &endpoints, &creds);

        let url = flow.authorization_url(&AuthorizationRequest {
            redirect_uri: "http://localhost:3000/callback",
            scopes: &[],
            access_type: AccessType::default(),
            prompt: None,
        });

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.readonly"));
        assert!(url.contains("access_type=offline"));
        assert!(!url.contains("prompt="));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn test_authorization_url_joins_scopes_and_adds_prompt() {
        let client = reqwest::Client::new();
        let endpoints = Endpoints::default();
        let creds = credentials();
        let flow = OAuthFlow::new(&client, &endpoints, &creds);
        let scopes = vec!["scope.a".to_string(), "scope.b".to_string()];

        let url = flow.authorization_url(&AuthorizationRequest {
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob",
            scopes: &scopes,
            access_type: AccessType::Online,
            prompt: Some(Prompt::SelectAccount),
        });

        assert!(url.contains("scope=scope.a%20scope.b"));
        assert!(url.contains("access_type=online"));
        assert!(url.ends_with("&prompt=select_account"));
    }

    #[test]
    fn test_prompt_wire_names() {
        let none: Prompt = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(none, Prompt::NoPrompt);
        let select: Prompt = serde_json::from_str("\"select_account\"").unwrap();
        assert_eq!(select.as_str(), "select_account");
        assert!(serde_json::from_str::<Prompt>("\"always\"").is_err());
    }

    #[test]
    fn test_client_secret_not_in_debug() {
        assert!(!format!("{:?}", credentials()).contains("\"secret\""));
    }
}
