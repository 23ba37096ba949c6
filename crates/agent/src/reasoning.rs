//! Reasoning sessions: an LLM that may call discovered tools before
//! answering.
//!
//! A [`ReasoningSession`] is built per request and consumed by one run. The
//! [`ToolCallingAgent`] loop is: send transcript, execute any tool calls,
//! append the results, repeat until the model answers with text only or
//! the iteration limit is hit.

use async_trait::async_trait;
use scout_config::AppConfig;
use scout_core::error::Error;
use scout_core::message::{Message, Transcript};
use scout_core::provider::{Provider, ProviderRequest};
use scout_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one reasoning run needs.
pub struct ReasoningSession {
    pub system_prompt: String,
    pub prompt: String,
    pub tools: ToolRegistry,
}

/// Runs a reasoning session to a final text answer.
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    async fn run(&self, session: ReasoningSession) -> Result<String, Error>;

    /// Whether the model behind the agent is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Tool-calling loop over any [`Provider`].
pub struct ToolCallingAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
}

impl ToolCallingAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations: 8,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, config.model.name.clone(), config.model.temperature)
            .with_max_tokens(config.model.max_tokens)
            .with_max_iterations(config.model.max_tool_iterations)
    }

    /// Set the maximum number of model calls per session.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

#[async_trait]
impl ReasoningAgent for ToolCallingAgent {
    async fn run(&self, session: ReasoningSession) -> Result<String, Error> {
        let mut transcript = Transcript::seeded(session.system_prompt, session.prompt);
        let tools = session.tools;
        let tool_definitions = tools.definitions();

        info!(
            session_id = %transcript.id,
            provider = self.provider.name(),
            tools = tools.len(),
            "Starting reasoning session"
        );

        let mut total_tokens: u32 = 0;

        for iteration in 1..=self.max_iterations {
            debug!(session_id = %transcript.id, iteration, "Reasoning iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: transcript.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self.provider.complete(request).await?;
            if let Some(usage) = &response.usage {
                total_tokens = total_tokens.saturating_add(usage.total_tokens);
            }

            if response.message.tool_calls.is_empty() {
                let answer = response.message.content.clone();
                transcript.push(response.message);
                debug!(
                    session_id = %transcript.id,
                    tool_results = transcript.tool_results(),
                    total_tokens,
                    "Reasoning session finished"
                );
                return Ok(answer);
            }

            let tool_calls = response.message.tool_calls.clone();
            transcript.push(response.message);

            for tc in &tool_calls {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
                };

                match tools.execute(&call).await {
                    Ok(result) => {
                        debug!(tool = %tc.name, success = result.success, "Tool executed");
                        let content = if result.success {
                            result.output
                        } else {
                            format!("Error: {}", result.output)
                        };
                        transcript.push(Message::tool_result(&tc.id, content));
                    }
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Tool execution failed");
                        // The model sees the failure and may recover.
                        transcript.push(Message::tool_result(&tc.id, format!("Error: {e}")));
                    }
                }
            }
        }

        warn!(
            session_id = %transcript.id,
            max_iterations = self.max_iterations,
            total_tokens,
            "Reasoning session hit the iteration limit without an answer"
        );
        Ok(String::new())
    }

    async fn health_check(&self) -> bool {
        match self.provider.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Model health check failed");
                false
            }
        }
    }
}
