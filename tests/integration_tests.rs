//! Integration tests for the Gmail Assistant MCP server
//!
//! The Gmail API and OAuth token endpoint are stubbed with wiremock; no real
//! API calls are made.

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gmail_assistant_mcp::config::{env, Config, Endpoints};
use gmail_assistant_mcp::gmail::utils::{decode_base64url_string, encode_base64url};
use gmail_assistant_mcp::mcp::server::McpServer;
use gmail_assistant_mcp::mcp::tools::ToolHandler;
use gmail_assistant_mcp::mcp::types::CallToolResult;

fn endpoints_for(server: &MockServer) -> Endpoints {
    Endpoints {
        auth_url: format!("{}/auth", server.uri()),
        token_url: format!("{}/token", server.uri()),
        api_base_url: format!("{}/gmail/v1", server.uri()),
    }
}

fn handler_with(server: &MockServer, settings: &[(&str, &str)]) -> ToolHandler {
    let settings: Vec<(String, String)> = settings
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Config::from_lookup(move |key| {
        settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .with_endpoints(endpoints_for(server));
    ToolHandler::new(config)
}

fn client_settings() -> Vec<(&'static str, &'static str)> {
    vec![
        (env::CLIENT_ID, "client-123"),
        (env::CLIENT_SECRET, "secret-456"),
        (env::REDIRECT_URI, "http://localhost:3000/callback"),
    ]
}

/// Success payload of a result
fn payload(result: &CallToolResult) -> Value {
    assert!(!result.is_error, "unexpected failure: {}", result.text());
    serde_json::from_str(result.text()).expect("payload is JSON")
}

/// Failure payload of a result
fn failure(result: &CallToolResult) -> Value {
    assert!(result.is_error, "unexpected success: {}", result.text());
    serde_json::from_str(result.text()).expect("failure is JSON")
}

mod unread_email_tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_and_decodes_unread_emails_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("q", "is:unread"))
            .and(query_param("maxResults", "2"))
            .and(header("authorization", "Bearer arg-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    {"id": "m1", "threadId": "t1"},
                    {"id": "m2", "threadId": "t2"}
                ],
                "resultSizeEstimate": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m1"))
            .and(query_param("format", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m1",
                "threadId": "t1",
                "snippet": "Fish &amp; chips?",
                "payload": {
                    "mimeType": "text/plain",
                    "headers": [
                        {"name": "From", "value": "Alice <alice@example.com>"},
                        {"name": "Subject", "value": "Lunch"}
                    ],
                    "body": {"size": 14, "data": encode_base64url("Fish &amp; chips at 1?")}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m2"))
            .and(query_param("format", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m2",
                "threadId": "t2",
                "snippet": "Report attached",
                "payload": {
                    "mimeType": "multipart/mixed",
                    "headers": [
                        {"name": "FROM", "value": "bob@example.com"},
                        {"name": "subject", "value": "Q3 report"}
                    ],
                    "body": {"size": 0},
                    "parts": [
                        {
                            "mimeType": "multipart/alternative",
                            "body": {"size": 0},
                            "parts": [
                                {"mimeType": "text/plain", "body": {"data": encode_base64url("See attached.")}},
                                {"mimeType": "text/html", "body": {"data": encode_base64url("<p>See attached.</p>")}}
                            ]
                        },
                        {"mimeType": "application/pdf", "filename": "q3.pdf", "body": {"attachmentId": "a1", "size": 100}}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[]);
        let result = handler
            .call_tool(
                "get_unread_emails",
                json!({"accessToken": "arg-token", "maxResults": 2}),
            )
            .await;

        let emails = payload(&result);
        let emails = emails.as_array().unwrap();
        assert_eq!(emails.len(), 2);

        assert_eq!(emails[0]["id"], "m1");
        assert_eq!(emails[0]["threadId"], "t1");
        assert_eq!(emails[0]["from"], "Alice <alice@example.com>");
        assert_eq!(emails[0]["subject"], "Lunch");
        assert_eq!(emails[0]["snippet"], "Fish & chips?");
        assert_eq!(emails[0]["body"], "Fish & chips at 1?");

        assert_eq!(emails[1]["id"], "m2");
        assert_eq!(emails[1]["from"], "bob@example.com");
        assert_eq!(emails[1]["subject"], "Q3 report");
        assert_eq!(emails[1]["body"], "See attached.");
    }

    #[tokio::test]
    async fn test_env_token_and_defaults() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("maxResults", "10"))
            .and(header("authorization", "Bearer env-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "env-token")]);
        let result = handler.call_tool("get_unread_emails", Value::Null).await;

        assert_eq!(payload(&result), json!([]));
    }

    #[tokio::test]
    async fn test_max_results_zero_fetches_no_details() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("maxResults", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"id": "m1", "threadId": "t1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
            .expect(0)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "token")]);
        let result = handler
            .call_tool("get_unread_emails", json!({"maxResults": 0}))
            .await;

        assert_eq!(payload(&result), json!([]));
    }

    #[tokio::test]
    async fn test_failed_detail_fetch_fails_whole_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"id": "m1"}, {"id": "m2"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m2"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Requested entity was not found."}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "token")]);
        let result = handler.call_tool("get_unread_emails", json!({})).await;

        let failure = failure(&result);
        assert!(failure["error"]
            .as_str()
            .unwrap()
            .contains("Requested entity was not found."));
        assert_eq!(failure["details"]["status"], 404);
    }

    #[tokio::test]
    async fn test_remote_error_message_surfaces() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "Invalid Credentials", "status": "UNAUTHENTICATED"}
            })))
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "stale")]);
        let result = handler.call_tool("get_unread_emails", json!({})).await;

        let failure = failure(&result);
        assert!(failure["error"].as_str().unwrap().contains("Invalid Credentials"));
        assert_eq!(failure["details"]["status"], 401);
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_request() {
        let server = MockServer::start().await;

        let handler = handler_with(&server, &client_settings());
        let result = handler.call_tool("get_unread_emails", json!({})).await;

        let failure = failure(&result);
        let message = failure["error"].as_str().unwrap();
        assert!(message.contains("gmail_get_auth_url"));
        assert!(message.contains("gmail_refresh_access_token"));
        assert_eq!(failure["details"]["clientId"], true);
        assert_eq!(failure["details"]["accessToken"], false);

        let requests = server.received_requests().await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_make_no_request() {
        let server = MockServer::start().await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "token")]);
        let too_many = handler
            .call_tool("get_unread_emails", json!({"maxResults": 501}))
            .await;
        let unknown = handler
            .call_tool("get_unread_emails", json!({"labelIds": ["INBOX"]}))
            .await;

        assert!(failure(&too_many)["error"].as_str().unwrap().contains("Invalid arguments"));
        assert!(failure(&unknown)["error"].as_str().unwrap().contains("labelIds"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

mod draft_reply_tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_threaded_draft_reply() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/orig-1"))
            .and(query_param("format", "metadata"))
            .and(query_param("metadataHeaders", "Message-ID"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "orig-1",
                "threadId": "thread-9",
                "payload": {
                    "headers": [
                        {"name": "From", "value": "Alice <alice@example.com>"},
                        {"name": "Subject", "value": "Lunch tomorrow"},
                        {"name": "Message-ID", "value": "<orig@mail.example.com>"},
                        {"name": "References", "value": "<root@mail.example.com>"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/drafts"))
            .and(header("authorization", "Bearer token"))
            .and(body_string_contains("\"threadId\":\"thread-9\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "draft-1",
                "message": {"id": "msg-2", "threadId": "thread-9", "labelIds": ["DRAFT"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "token")]);
        let result = handler
            .call_tool(
                "create_draft_reply",
                json!({"messageId": "orig-1", "body": "Sounds great, see you at noon."}),
            )
            .await;

        let draft = payload(&result);
        assert_eq!(draft["id"], "draft-1");
        assert_eq!(draft["message"]["threadId"], "thread-9");

        let requests = server.received_requests().await.unwrap();
        let post = requests
            .iter()
            .find(|r| r.method.as_str() == "POST")
            .expect("draft request sent");
        let body: Value = serde_json::from_slice(&post.body).unwrap();
        let raw = decode_base64url_string(body["message"]["raw"].as_str().unwrap()).unwrap();

        assert!(raw.starts_with("To: Alice <alice@example.com>\r\n"));
        assert!(raw.contains("Subject: Re: Lunch tomorrow\r\n"));
        assert!(raw.contains("In-Reply-To: <orig@mail.example.com>\r\n"));
        assert!(raw.contains("References: <root@mail.example.com> <orig@mail.example.com>\r\n"));
        assert!(raw.ends_with("\r\n\r\nSounds great, see you at noon."));
    }

    #[tokio::test]
    async fn test_original_without_sender_fails_before_posting() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/orig-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "orig-2",
                "payload": {"headers": [{"name": "Subject", "value": "No sender"}]}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/drafts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "never"})))
            .expect(0)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "token")]);
        let result = handler
            .call_tool("create_draft_reply", json!({"messageId": "orig-2", "body": "hi"}))
            .await;

        assert!(failure(&result)["error"].as_str().unwrap().contains("From"));
    }
}

mod oauth_tests {
    use super::*;

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .and(body_string_contains("client_id=client-123"))
            .and(body_string_contains("client_secret=secret-456"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.new",
                "refresh_token": "1//refresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &client_settings());
        let result = handler
            .call_tool("gmail_exchange_code", json!({"code": " abc123 "}))
            .await;

        let tokens = payload(&result);
        assert_eq!(tokens["access_token"], "ya29.new");
        assert_eq!(tokens["refresh_token"], "1//refresh");
    }

    #[tokio::test]
    async fn test_exchange_code_error_description() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Malformed auth code."
            })))
            .mount(&server)
            .await;

        let handler = handler_with(&server, &client_settings());
        let result = handler
            .call_tool("gmail_exchange_code", json!({"code": "bad"}))
            .await;

        let failure = failure(&result);
        assert!(failure["error"].as_str().unwrap().contains("Malformed auth code."));
        assert_eq!(failure["details"]["status"], 400);
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=env-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = client_settings();
        settings.push((env::REFRESH_TOKEN, "env-refresh"));
        let handler = handler_with(&server, &settings);
        let result = handler.call_tool("gmail_refresh_access_token", json!({})).await;

        assert_eq!(payload(&result)["access_token"], "ya29.fresh");
    }

    #[tokio::test]
    async fn test_non_json_token_response_is_wrapped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let handler = handler_with(&server, &client_settings());
        let result = handler
            .call_tool("gmail_refresh_access_token", json!({"refreshToken": "r"}))
            .await;

        assert_eq!(payload(&result), json!({"raw": "ok"}));
    }

    #[tokio::test]
    async fn test_auth_url_scopes() {
        let server = MockServer::start().await;

        let handler = handler_with(&server, &client_settings());
        let result = handler
            .call_tool(
                "gmail_get_auth_url",
                json!({
                    "scope": [
                        "https://www.googleapis.com/auth/gmail.readonly",
                        "https://www.googleapis.com/auth/gmail.compose"
                    ],
                    "accessType": "online"
                }),
            )
            .await;

        let url = payload(&result)["url"].as_str().unwrap().to_string();
        assert!(url.starts_with(&format!("{}/auth?", server.uri())));
        assert!(url.contains("gmail.readonly%20https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.compose"));
        assert!(url.contains("access_type=online"));
        assert!(!url.contains("prompt="));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

mod argument_precedence_tests {
    use super::*;

    #[tokio::test]
    async fn test_access_token_argument_overrides_env() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(header("authorization", "Bearer arg-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &[(env::ACCESS_TOKEN, "env-token")]);
        let result = handler
            .call_tool("get_unread_emails", json!({"accessToken": "arg-token"}))
            .await;

        assert_eq!(payload(&result), json!([]));
    }

    #[tokio::test]
    async fn test_refresh_token_argument_overrides_env() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("refresh_token=arg-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "ya29.arg"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = client_settings();
        settings.push((env::REFRESH_TOKEN, "env-refresh"));
        let handler = handler_with(&server, &settings);
        let result = handler
            .call_tool("gmail_refresh_access_token", json!({"refreshToken": "arg-refresh"}))
            .await;

        assert_eq!(payload(&result)["access_token"], "ya29.arg");
    }

    #[tokio::test]
    async fn test_redirect_uri_argument_overrides_env() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Foauth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "ya29.code"})))
            .expect(1)
            .mount(&server)
            .await;

        let handler = handler_with(&server, &client_settings());
        let exchanged = handler
            .call_tool(
                "gmail_exchange_code",
                json!({"code": "abc123", "redirectUri": "https://app.example.com/oauth"}),
            )
            .await;
        assert_eq!(payload(&exchanged)["access_token"], "ya29.code");

        let auth_url = handler
            .call_tool(
                "gmail_get_auth_url",
                json!({"redirectUri": "https://app.example.com/oauth"}),
            )
            .await;
        let url = payload(&auth_url)["url"].as_str().unwrap().to_string();
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Foauth&"));
        assert!(!url.contains("localhost"));
    }
}

mod mcp_protocol_tests {
    use super::*;

    async fn run_session(server: &MockServer, input: &str) -> Vec<Value> {
        let mut mcp = McpServer::new(handler_with(server, &[]));
        let mut output = Vec::new();
        mcp.run(input.as_bytes(), &mut output).await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stdio_session() {
        let server = MockServer::start().await;
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_time","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"unknown_tool"}}"#,
        ]
        .join("\n");

        let responses = run_session(&server, &input).await;
        assert_eq!(responses.len(), 4);

        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");

        assert_eq!(responses[1]["id"], 2);
        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));

        assert_eq!(responses[2]["id"], 3);
        let time_text = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
        let time: Value = serde_json::from_str(time_text).unwrap();
        assert!(time["utc"].as_str().unwrap().ends_with('Z'));

        assert_eq!(responses[3]["id"], 4);
        assert_eq!(responses[3]["result"]["isError"], true);
        assert!(responses[3]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown tool: unknown_tool"));
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let server = MockServer::start().await;
        let input = "this is not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n";

        let responses = run_session(&server, input).await;
        assert_eq!(responses.len(), 2);

        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[0]["error"]["code"], -32700);

        assert_eq!(responses[1]["id"], 7);
        assert_eq!(responses[1]["result"], json!({}));
    }
}
