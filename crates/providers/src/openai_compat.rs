//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, LiteLLM, vLLM, Ollama and anything else
//! exposing `/chat/completions` with function calling. Reasoning sessions
//! only need non-streaming completions, so that is all this client speaks.

use async_trait::async_trait;
use scout_config::AppConfig;
use scout_core::error::ProviderError;
use scout_core::message::{Message, MessageToolCall, Role};
use scout_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Build the reasoning provider from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(
            "openai_compat",
            config.model.api_url.clone(),
            config.model.api_key.clone(),
            config.response_timeout(),
        )
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = tool_calls;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(network_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn provider(base_url: &str, api_key: Option<&str>) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            "test",
            base_url,
            api_key.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "claude-3-7-sonnet".into(),
            messages: vec![Message::system("Be brief"), Message::user("Hi")],
            temperature: 0.1,
            max_tokens: Some(256),
            tools: vec![],
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let p = provider("http://localhost:4000/v1/", None);
        assert_eq!(p.base_url, "http://localhost:4000/v1");
    }

    #[test]
    fn from_config_uses_model_section() {
        let mut config = AppConfig::default();
        config.model.api_url = "https://llm.internal/v1".into();
        let p = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(p.base_url, "https://llm.internal/v1");
        assert!(p.api_key.is_none());
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "get_user_preferences".into(),
            arguments: r#"{"user_id":"u-1"}"#.into(),
        }];
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "get_user_preferences");
    }

    #[test]
    fn message_conversion_tool_response() {
        let msg = Message::tool_result("call_1", "result data");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "get_user_preferences".into(),
            description: "Look up preferences".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "get_user_preferences");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[tokio::test]
    async fn complete_parses_text_reply() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer sk-test"
                );
                assert_eq!(body["max_tokens"], 256);
                assert!(body.get("tools").is_none());
                Json(serde_json::json!({
                    "model": "claude-3-7-sonnet",
                    "choices": [{ "message": { "role": "assistant", "content": "Hello there" } }],
                    "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
                }))
            }),
        );
        let base = test_server::spawn(router).await;

        let response = provider(&base, Some("sk-test"))
            .complete(request())
            .await
            .unwrap();
        assert_eq!(response.message.content, "Hello there");
        assert!(response.message.tool_calls.is_empty());
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn complete_parses_tool_calls() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "model": "m",
                    "choices": [{ "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_9",
                            "type": "function",
                            "function": { "name": "get_history", "arguments": "{\"user_id\":\"u1\"}" }
                        }]
                    } }]
                }))
            }),
        );
        let base = test_server::spawn(router).await;

        let response = provider(&base, None).complete(request()).await.unwrap();
        assert_eq!(response.message.content, "");
        assert_eq!(response.message.tool_calls.len(), 1);
        assert_eq!(response.message.tool_calls[0].name, "get_history");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let router = Router::new()
            .route(
                "/limited/chat/completions",
                post(|| async { StatusCode::TOO_MANY_REQUESTS }),
            )
            .route(
                "/denied/chat/completions",
                post(|| async { StatusCode::UNAUTHORIZED }),
            )
            .route(
                "/broken/chat/completions",
                post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            );
        let base = test_server::spawn(router).await;

        let err = provider(&format!("{base}/limited"), None)
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));

        let err = provider(&format!("{base}/denied"), None)
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

        let err = provider(&format!("{base}/broken"), None)
            .complete(request())
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(serde_json::json!({ "model": "m", "choices": [] })) }),
        );
        let base = test_server::spawn(router).await;

        let err = provider(&base, None).complete(request()).await.unwrap_err();
        assert!(err.to_string().contains("No choices"));
    }

    #[tokio::test]
    async fn health_check_reflects_models_endpoint() {
        let router = Router::new().route(
            "/models",
            get(|| async { Json(serde_json::json!({ "data": [] })) }),
        );
        let base = test_server::spawn(router).await;

        assert!(provider(&base, None).health_check().await.unwrap());
        assert!(
            !provider(&format!("{base}/missing"), None)
                .health_check()
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let err = provider("http://127.0.0.1:1", None)
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Network(_) | ProviderError::Timeout(_)
        ));
    }
}
