//! Scripted stand-ins for every collaborator the pipeline talks to.

use async_trait::async_trait;
use scout_config::AppConfig;
use scout_core::discovery::{DiscoverySession, ToolDiscovery};
use scout_core::error::{DiscoveryError, Error, KnowledgeError, ProviderError, ToolError};
use scout_core::knowledge::{KnowledgeBase, KnowledgeRequest, KnowledgeResponse};
use scout_core::message::{Message, MessageToolCall};
use scout_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use scout_core::tool::{Tool, ToolResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::reasoning::{ReasoningAgent, ReasoningSession};

/// A config with every required setting present.
pub fn complete_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.knowledge_base.id = Some("KB123".into());
    config.tool_gateway.mcp_url = Some("http://gateway.test/mcp".into());
    config.guardrails.id = Some("gr-1".into());
    config
}

/// Build a knowledge response from generated text and raw citation JSON.
pub fn knowledge_response(text: &str, citations: serde_json::Value) -> KnowledgeResponse {
    serde_json::from_value(serde_json::json!({
        "output": { "text": text },
        "citations": citations,
    }))
    .unwrap()
}

// --- LLM provider ---

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    call_count: Mutex<usize>,
    last_request: Mutex<Option<ProviderRequest>>,
    health: Option<Result<bool, ProviderError>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            last_request: Mutex::new(None),
            health: None,
        }
    }

    /// Override what `health_check` reports.
    pub fn with_health(mut self, health: Result<bool, ProviderError>) -> Self {
        self.health = Some(health);
        self
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, thought),
            make_text_response(answer),
        ])
    }

    /// Create a provider whose first call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.health.clone().unwrap_or(Ok(true))
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        *self.last_request.lock().unwrap() = Some(request);
        let response = responses[*count].clone();
        *count += 1;
        response
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut response = make_text_response(thought);
    response.message.tool_calls = tool_calls;
    response
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// --- Knowledge base ---

enum KnowledgeScript {
    Answer(KnowledgeResponse),
    Fail(KnowledgeError),
    Panic,
}

pub struct ScriptedKnowledgeBase {
    script: KnowledgeScript,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<KnowledgeRequest>>,
}

impl ScriptedKnowledgeBase {
    fn with_script(script: KnowledgeScript) -> Self {
        Self {
            script,
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn answering(response: KnowledgeResponse) -> Self {
        Self::with_script(KnowledgeScript::Answer(response))
    }

    pub fn failing(error: KnowledgeError) -> Self {
        Self::with_script(KnowledgeScript::Fail(error))
    }

    pub fn panicking() -> Self {
        Self::with_script(KnowledgeScript::Panic)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<KnowledgeRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBase for ScriptedKnowledgeBase {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn retrieve_and_generate(
        &self,
        request: KnowledgeRequest,
    ) -> Result<KnowledgeResponse, KnowledgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            KnowledgeScript::Answer(response) => Ok(response.clone()),
            KnowledgeScript::Fail(error) => Err(error.clone()),
            KnowledgeScript::Panic => panic!("scripted knowledge base panic"),
        }
    }
}

// --- Tools and discovery ---

/// A tool that always returns the same output and records its calls.
pub struct StaticTool {
    name: String,
    output: String,
    calls: AtomicUsize,
    last_arguments: Mutex<Option<serde_json::Value>>,
}

impl StaticTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            calls: AtomicUsize::new(0),
            last_arguments: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_arguments(&self) -> Option<serde_json::Value> {
        self.last_arguments.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted personalisation tool"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "user_id": { "type": "string" } }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_arguments.lock().unwrap() = Some(arguments);
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: self.output.clone(),
            data: None,
        })
    }
}

/// A gateway that hands out scripted sessions and counts opens and closes.
pub struct ScriptedDiscovery {
    tools: Vec<Arc<dyn Tool>>,
    connect_error: Option<DiscoveryError>,
    list_error: Option<DiscoveryError>,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl ScriptedDiscovery {
    fn build(
        tools: Vec<Arc<dyn Tool>>,
        connect_error: Option<DiscoveryError>,
        list_error: Option<DiscoveryError>,
    ) -> Self {
        Self {
            tools,
            connect_error,
            list_error,
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self::build(tools, None, None)
    }

    pub fn refusing(error: DiscoveryError) -> Self {
        Self::build(vec![], Some(error), None)
    }

    pub fn failing_list(error: DiscoveryError) -> Self {
        Self::build(vec![], None, Some(error))
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolDiscovery for ScriptedDiscovery {
    fn endpoint(&self) -> &str {
        "scripted://gateway"
    }

    async fn connect(&self) -> Result<Box<dyn DiscoverySession>, DiscoveryError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        Ok(Box::new(ScriptedSession {
            tools: self.tools.clone(),
            list_error: self.list_error.clone(),
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct ScriptedSession {
    tools: Vec<Arc<dyn Tool>>,
    list_error: Option<DiscoveryError>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl DiscoverySession for ScriptedSession {
    async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError> {
        match &self.list_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.tools.clone()),
        }
    }

    async fn close(&self) -> Result<(), DiscoveryError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// --- Reasoning agent ---

enum AgentScript {
    Reply(String),
    Fail,
    Panic,
}

/// A reasoning agent that answers from a script and records what it saw.
pub struct ScriptedAgent {
    script: AgentScript,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen_tools: Mutex<Vec<String>>,
    last_system_prompt: Mutex<Option<String>>,
}

impl ScriptedAgent {
    fn with_script(script: AgentScript) -> Self {
        Self {
            script,
            delay: None,
            calls: AtomicUsize::new(0),
            seen_tools: Mutex::new(Vec::new()),
            last_system_prompt: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_script(AgentScript::Reply(text.into()))
    }

    pub fn failing() -> Self {
        Self::with_script(AgentScript::Fail)
    }

    pub fn panicking() -> Self {
        Self::with_script(AgentScript::Panic)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_tools(&self) -> Vec<String> {
        self.seen_tools.lock().unwrap().clone()
    }

    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_system_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningAgent for ScriptedAgent {
    async fn run(&self, session: ReasoningSession) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_tools.lock().unwrap() =
            session.tools.names().into_iter().map(String::from).collect();
        *self.last_system_prompt.lock().unwrap() = Some(session.system_prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            AgentScript::Reply(text) => Ok(text.clone()),
            AgentScript::Fail => Err(ProviderError::ApiError {
                status_code: 500,
                message: "model unavailable".into(),
            }
            .into()),
            AgentScript::Panic => panic!("scripted reasoning panic"),
        }
    }
}
