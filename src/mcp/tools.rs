//! MCP Tool definitions and handlers
//!
//! Defines the fixed tool catalog, the typed arguments of each tool and the
//! dispatcher that runs a call and wraps its outcome in a result envelope.

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors};

use crate::config::{google, Config};
use crate::error::{AuthError, GmailApiError, GmailMcpError, McpError, Result, ValidationError};
use crate::gmail::auth::{AccessType, AuthorizationRequest, OAuthFlow, Prompt};
use crate::gmail::client::GmailClient;
use crate::gmail::utils::{require, sanitize, sanitize_opt};
use crate::mcp::types::{CallToolResult, Tool, ToolFailure};

/// The tools this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetTime,
    GmailGetAuthUrl,
    GmailExchangeCode,
    GmailRefreshAccessToken,
    GetUnreadEmails,
    CreateDraftReply,
}

impl ToolName {
    /// Every tool, in catalog order
    pub const ALL: [ToolName; 6] = [
        ToolName::GetTime,
        ToolName::GmailGetAuthUrl,
        ToolName::GmailExchangeCode,
        ToolName::GmailRefreshAccessToken,
        ToolName::GetUnreadEmails,
        ToolName::CreateDraftReply,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::GetTime => "get_time",
            ToolName::GmailGetAuthUrl => "gmail_get_auth_url",
            ToolName::GmailExchangeCode => "gmail_exchange_code",
            ToolName::GmailRefreshAccessToken => "gmail_refresh_access_token",
            ToolName::GetUnreadEmails => "get_unread_emails",
            ToolName::CreateDraftReply => "create_draft_reply",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::GetTime => "Returns the current UTC time as an ISO-8601 timestamp",
            ToolName::GmailGetAuthUrl => {
                "Builds the Google OAuth authorization URL the user opens to grant Gmail access"
            }
            ToolName::GmailExchangeCode => {
                "Exchanges an OAuth authorization code for access and refresh tokens"
            }
            ToolName::GmailRefreshAccessToken => {
                "Obtains a new access token using a refresh token"
            }
            ToolName::GetUnreadEmails => {
                "Lists unread emails with sender, subject, snippet and plain-text body"
            }
            ToolName::CreateDraftReply => {
                "Creates a draft reply to an email, threaded with the original message"
            }
        }
    }

    /// JSON Schema of the tool's arguments
    pub fn input_schema(self) -> Value {
        match self {
            ToolName::GetTime => schema_for::<NoArgs>(),
            ToolName::GmailGetAuthUrl => schema_for::<AuthUrlArgs>(),
            ToolName::GmailExchangeCode => schema_for::<ExchangeCodeArgs>(),
            ToolName::GmailRefreshAccessToken => schema_for::<RefreshTokenArgs>(),
            ToolName::GetUnreadEmails => schema_for::<UnreadEmailsArgs>(),
            ToolName::CreateDraftReply => schema_for::<DraftReplyArgs>(),
        }
    }

    pub fn definition(self) -> Tool {
        Tool {
            name: self.as_str().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
        }
    }
}

impl FromStr for ToolName {
    type Err = McpError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == name)
            .ok_or_else(|| McpError::UnknownTool {
                name: name.to_string(),
            })
    }
}

/// Root schema with subschemas inlined, so every tool schema is self-contained
fn schema_for<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator()
        .into_root_schema_for::<T>();

    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(ref mut map) = value {
        map.remove("title");
    }
    value
}

// ==================== Tool Arguments ====================

/// Arguments of a tool that takes none
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

impl Validate for NoArgs {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Ok(())
    }
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthUrlArgs {
    #[schemars(description = "OAuth redirect URI. Defaults to GOOGLE_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    #[schemars(
        description = "OAuth scopes to request. Defaults to https://www.googleapis.com/auth/gmail.readonly"
    )]
    #[validate(length(min = 1))]
    pub scope: Option<Vec<String>>,

    #[schemars(description = "Whether to issue a refresh token (offline) or not (online)")]
    #[serde(default)]
    pub access_type: AccessType,

    #[schemars(description = "Consent screen behavior. Omitted from the URL when not given")]
    pub prompt: Option<Prompt>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExchangeCodeArgs {
    #[schemars(description = "Authorization code from the OAuth redirect")]
    pub code: String,

    #[schemars(
        description = "Redirect URI used when requesting the code. Defaults to GOOGLE_REDIRECT_URI"
    )]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshTokenArgs {
    #[schemars(description = "Refresh token. Defaults to GOOGLE_REFRESH_TOKEN")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnreadEmailsArgs {
    #[schemars(description = "OAuth access token. Defaults to GOOGLE_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    #[schemars(description = "Gmail user ID (default: me)")]
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[schemars(description = "Maximum number of unread emails to return (default: 10)")]
    #[serde(default = "default_max_results")]
    #[validate(range(max = 500))]
    pub max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DraftReplyArgs {
    #[schemars(description = "OAuth access token. Defaults to GOOGLE_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    #[schemars(description = "Gmail user ID (default: me)")]
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[schemars(description = "ID of the email to reply to")]
    pub message_id: String,

    #[schemars(description = "Plain-text body of the reply")]
    #[validate(length(min = 1))]
    pub body: String,
}

fn default_user_id() -> String {
    google::USER_ID.to_string()
}

fn default_max_results() -> u32 {
    10
}

/// Deserialize and validate a tool's arguments. `null` counts as `{}`.
fn parse_args<T: DeserializeOwned + Validate>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };

    let parsed: T = serde_json::from_value(args).map_err(|e| {
        GmailMcpError::Validation(ValidationError::InvalidArguments {
            message: e.to_string(),
        })
    })?;

    parsed.validate().map_err(|e| {
        GmailMcpError::Validation(ValidationError::InvalidArguments {
            message: e.to_string(),
        })
    })?;

    Ok(parsed)
}

/// A tool call with validated arguments
#[derive(Debug)]
pub enum ToolCall {
    GetTime,
    GmailGetAuthUrl(AuthUrlArgs),
    GmailExchangeCode(ExchangeCodeArgs),
    GmailRefreshAccessToken(RefreshTokenArgs),
    GetUnreadEmails(UnreadEmailsArgs),
    CreateDraftReply(DraftReplyArgs),
}

impl ToolCall {
    /// Resolve the tool name and parse its arguments
    pub fn parse(name: &str, args: Value) -> Result<Self> {
        let tool: ToolName = name.parse()?;

        Ok(match tool {
            ToolName::GetTime => {
                parse_args::<NoArgs>(args)?;
                ToolCall::GetTime
            }
            ToolName::GmailGetAuthUrl => ToolCall::GmailGetAuthUrl(parse_args(args)?),
            ToolName::GmailExchangeCode => ToolCall::GmailExchangeCode(parse_args(args)?),
            ToolName::GmailRefreshAccessToken => {
                ToolCall::GmailRefreshAccessToken(parse_args(args)?)
            }
            ToolName::GetUnreadEmails => ToolCall::GetUnreadEmails(parse_args(args)?),
            ToolName::CreateDraftReply => ToolCall::CreateDraftReply(parse_args(args)?),
        })
    }
}

// ==================== Tool Handler ====================

/// Tool handler
pub struct ToolHandler {
    config: Config,
    http_client: reqwest::Client,
    gmail_client: GmailClient,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(config: Config) -> Self {
        let http_client = reqwest::Client::new();
        let gmail_client = GmailClient::new(http_client.clone(), &config.endpoints.api_base_url);

        Self {
            config,
            http_client,
            gmail_client,
        }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        ToolName::ALL.into_iter().map(ToolName::definition).collect()
    }

    /// Call a tool by name. Failures come back as error results.
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        tracing::info!(tool = %name, "Calling tool");

        let outcome = match ToolCall::parse(name, args) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(payload) => CallToolResult::json(&payload),
            Err(e) => {
                tracing::warn!(tool = %name, "Tool call failed: {}", e);
                CallToolResult::failure(&ToolFailure {
                    error: e.to_string(),
                    details: self.failure_details(&e),
                })
            }
        }
    }

    async fn dispatch(&self, call: ToolCall) -> Result<Value> {
        match call {
            ToolCall::GetTime => Ok(self.handle_get_time()),
            ToolCall::GmailGetAuthUrl(args) => self.handle_get_auth_url(args),
            ToolCall::GmailExchangeCode(args) => self.handle_exchange_code(args).await,
            ToolCall::GmailRefreshAccessToken(args) => self.handle_refresh_token(args).await,
            ToolCall::GetUnreadEmails(args) => self.handle_unread_emails(args).await,
            ToolCall::CreateDraftReply(args) => self.handle_draft_reply(args).await,
        }
    }

    /// Credential failures report which settings exist; remote failures
    /// report the HTTP status.
    fn failure_details(&self, error: &GmailMcpError) -> Option<Value> {
        match error {
            GmailMcpError::Auth(_) => serde_json::to_value(self.config.auth_status()).ok(),
            GmailMcpError::Gmail(GmailApiError::RequestFailed { status, .. }) => {
                Some(json!({ "status": status }))
            }
            _ => None,
        }
    }

    fn redirect_uri(&self, arg: Option<String>) -> Result<String> {
        require(
            "redirectUri",
            sanitize_opt(arg).or_else(|| self.config.redirect_uri.clone()),
        )
    }

    fn access_token(&self, arg: Option<String>) -> Result<SecretString> {
        sanitize_opt(arg)
            .map(SecretString::from)
            .or_else(|| self.config.access_token.clone())
            .ok_or_else(|| AuthError::MissingAccessToken.into())
    }

    // ==================== Tool Handlers ====================

    fn handle_get_time(&self) -> Value {
        json!({ "utc": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true) })
    }

    fn handle_get_auth_url(&self, args: AuthUrlArgs) -> Result<Value> {
        let redirect_uri = self.redirect_uri(args.redirect_uri)?;
        let scopes: Vec<String> = args
            .scope
            .unwrap_or_default()
            .iter()
            .filter_map(|s| sanitize(s))
            .collect();

        let credentials = self.config.client_credentials()?;
        let flow = OAuthFlow::new(&self.http_client, &self.config.endpoints, &credentials);

        let url = flow.authorization_url(&AuthorizationRequest {
            redirect_uri: &redirect_uri,
            scopes: &scopes,
            access_type: args.access_type,
            prompt: args.prompt,
        });

        Ok(json!({ "url": url }))
    }

    async fn handle_exchange_code(&self, args: ExchangeCodeArgs) -> Result<Value> {
        let code = require("code", sanitize(&args.code))?;
        let redirect_uri = self.redirect_uri(args.redirect_uri)?;

        let credentials = self.config.client_credentials()?;
        let flow = OAuthFlow::new(&self.http_client, &self.config.endpoints, &credentials);

        flow.exchange_code(&code, &redirect_uri).await
    }

    async fn handle_refresh_token(&self, args: RefreshTokenArgs) -> Result<Value> {
        let refresh_token = sanitize_opt(args.refresh_token)
            .map(SecretString::from)
            .or_else(|| self.config.refresh_token.clone())
            .ok_or(AuthError::MissingRefreshToken)?;

        let credentials = self.config.client_credentials()?;
        let flow = OAuthFlow::new(&self.http_client, &self.config.endpoints, &credentials);

        flow.refresh_access_token(&refresh_token).await
    }

    async fn handle_unread_emails(&self, args: UnreadEmailsArgs) -> Result<Value> {
        let token = self.access_token(args.access_token)?;
        let user_id = sanitize(&args.user_id).unwrap_or_else(default_user_id);

        let emails = self
            .gmail_client
            .unread_emails(&token, &user_id, args.max_results)
            .await?;

        tracing::info!("Returning {} unread emails", emails.len());
        Ok(serde_json::to_value(emails)?)
    }

    async fn handle_draft_reply(&self, args: DraftReplyArgs) -> Result<Value> {
        let message_id = require("messageId", sanitize(&args.message_id))?;
        let token = self.access_token(args.access_token)?;
        let user_id = sanitize(&args.user_id).unwrap_or_else(default_user_id);

        self.gmail_client
            .create_draft_reply(&token, &user_id, &message_id, &args.body)
            .await
    }
}
