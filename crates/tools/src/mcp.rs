//! MCP streamable-HTTP client.
//!
//! [`McpGateway`] is the long-lived handle built once at startup. Each call
//! to [`ToolDiscovery::connect`] performs the `initialize` handshake and
//! yields an [`McpSession`]; tools listed through that session share it and
//! stop working once it is closed.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use scout_config::AppConfig;
use scout_core::discovery::{DiscoverySession, ToolDiscovery};
use scout_core::error::{DiscoveryError, ToolError};
use scout_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::rpc;

pub const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// A configured MCP gateway endpoint.
pub struct McpGateway {
    url: String,
    bearer_token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl McpGateway {
    pub fn new(
        url: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::Connection(format!("HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            bearer_token,
            timeout,
            client,
        })
    }

    /// Build the gateway client from config. `Ok(None)` when no gateway
    /// endpoint is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, DiscoveryError> {
        let Some(url) = config
            .tool_gateway
            .mcp_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
        else {
            return Ok(None);
        };

        if config.tool_gateway.auth_required && config.tool_gateway.auth_token.is_none() {
            warn!("Gateway authentication is required but no token is configured");
        }

        Self::new(
            url.trim(),
            config.gateway_bearer_token().map(String::from),
            config.response_timeout(),
        )
        .map(Some)
    }
}

#[async_trait]
impl ToolDiscovery for McpGateway {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Box<dyn DiscoverySession>, DiscoveryError> {
        let mut inner = SessionInner {
            client: self.client.clone(),
            url: self.url.clone(),
            bearer_token: self.bearer_token.clone(),
            timeout: self.timeout,
            session_id: None,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        };

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "scout",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let (result, session_id) = inner.call("initialize", params).await?;
        inner.session_id = session_id;

        let server = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        debug!(
            endpoint = %self.url,
            server,
            session = inner.session_id.is_some(),
            "MCP session initialized"
        );

        inner.notify("notifications/initialized").await?;

        Ok(Box::new(McpSession {
            inner: Arc::new(inner),
        }))
    }
}

/// State shared by a session and every tool it listed.
struct SessionInner {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
    timeout: Duration,
    session_id: Option<String>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl SessionInner {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_BOTH));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(id) = self
            .session_id
            .as_deref()
            .and_then(|id| HeaderValue::from_str(id).ok())
        {
            headers.insert(SESSION_HEADER, id);
        }
        headers
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> DiscoveryError {
        if e.is_timeout() {
            DiscoveryError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            DiscoveryError::Connection(e.to_string())
        }
    }

    /// Send a request and return its result plus any session id the
    /// server assigned.
    async fn call(
        &self,
        method: &str,
        params: Value,
    ) -> Result<(Value, Option<String>), DiscoveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DiscoveryError::SessionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .authorized(self.client.post(&self.url))
            .headers(self.headers())
            .json(&rpc::request(id, method, params))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND && self.session_id.is_some() {
            return Err(DiscoveryError::SessionClosed);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(method, status = status.as_u16(), body = %body, "MCP request rejected");
            return Err(DiscoveryError::Connection(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let result = rpc::parse_body(&body, is_event_stream, id)?;
        Ok((result, session_id))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, DiscoveryError> {
        self.call(method, params).await.map(|(result, _)| result)
    }

    async fn notify(&self, method: &str) -> Result<(), DiscoveryError> {
        let response = self
            .authorized(self.client.post(&self.url))
            .headers(self.headers())
            .json(&rpc::notification(method))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Connection(format!(
                "{method} returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DiscoveryError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let Some(session_id) = &self.session_id else {
            return Ok(());
        };

        let response = self
            .authorized(self.client.delete(&self.url))
            .header(SESSION_HEADER, session_id)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        // 405: the server does not support client-initiated termination.
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::METHOD_NOT_ALLOWED {
            debug!(status = status.as_u16(), "MCP session delete not acknowledged");
        }
        Ok(())
    }
}

/// An open MCP session.
pub struct McpSession {
    inner: Arc<SessionInner>,
}

impl McpSession {
    pub fn session_id(&self) -> Option<&str> {
        self.inner.session_id.as_deref()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolDescriptor {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[async_trait]
impl DiscoverySession for McpSession {
    async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.inner.request("tools/list", params).await?;
            let page: ToolsPage = serde_json::from_value(result)
                .map_err(|e| DiscoveryError::Protocol(format!("tools/list: {e}")))?;

            for descriptor in page.tools {
                tools.push(Arc::new(McpTool {
                    session: Arc::clone(&self.inner),
                    name: descriptor.name,
                    description: descriptor.description.unwrap_or_default(),
                    input_schema: descriptor
                        .input_schema
                        .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
                }));
            }

            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(cursor = %next, "Gateway repeated a tools/list cursor; stopping");
                    break;
                }
                None => break,
            }
        }

        info!(tools = tools.len(), "Discovered gateway tools");
        Ok(tools)
    }

    async fn close(&self) -> Result<(), DiscoveryError> {
        self.inner.close().await
    }
}

/// A tool exposed by the gateway, invoked through `tools/call`.
pub struct McpTool {
    session: Arc<SessionInner>,
    name: String,
    description: String,
    input_schema: Value,
}

/// Join the text content items of a `tools/call` result.
fn content_text(result: &Value) -> String {
    let text: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return result
            .get("structuredContent")
            .map(Value::to_string)
            .unwrap_or_default();
    }
    text.join("\n")
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let arguments = match arguments {
            Value::Null => json!({}),
            Value::Object(_) => arguments,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected an object, got {other}"
                )));
            }
        };

        let result = self
            .session
            .request(
                "tools/call",
                json!({ "name": self.name, "arguments": arguments }),
            )
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: e.to_string(),
            })?;

        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let output = content_text(&result);
        debug!(tool = %self.name, is_error, output_len = output.len(), "Gateway tool returned");

        Ok(ToolResult {
            call_id: String::new(),
            success: !is_error,
            output,
            data: Some(result),
        })
    }
}
