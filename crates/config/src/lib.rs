//! Configuration loading, validation, and management for Scout.
//!
//! Loads configuration from `$SCOUT_CONFIG` or `~/.scout/config.toml`, then
//! applies environment variable overrides. The process loads it once at
//! startup; the required-settings check runs per request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cloud region the knowledge base and models live in
    #[serde(default = "default_region")]
    pub aws_region: String,

    /// Knowledge base (retrieval + generation) settings
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    /// Safety policy applied to generated answers
    #[serde(default)]
    pub guardrails: GuardrailsConfig,

    /// Personalisation tool gateway
    #[serde(default)]
    pub tool_gateway: ToolGatewayConfig,

    /// Model used for generation and reasoning sessions
    #[serde(default)]
    pub model: ModelConfig,

    /// Hard per-call timeout for every external call, in seconds
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_response_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("aws_region", &self.aws_region)
            .field("knowledge_base", &self.knowledge_base)
            .field("guardrails", &self.guardrails)
            .field("tool_gateway", &self.tool_gateway)
            .field("model", &self.model)
            .field("response_timeout_secs", &self.response_timeout_secs)
            .field("log_level", &self.log_level)
            .field("server", &self.server)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Knowledge base identifier (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Base URL of the retrieval-and-generation endpoint
    #[serde(default = "default_kb_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Supporting references requested per query
    #[serde(default = "default_number_of_results")]
    pub number_of_results: u32,
}

fn default_kb_endpoint() -> String {
    "http://localhost:9000".into()
}
fn default_number_of_results() -> u32 {
    10
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            id: None,
            endpoint: default_kb_endpoint(),
            api_key: None,
            number_of_results: default_number_of_results(),
        }
    }
}

impl std::fmt::Debug for KnowledgeBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseConfig")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("number_of_results", &self.number_of_results)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// Safety policy identifier (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default = "default_guardrail_version")]
    pub version: String,
}

fn default_guardrail_version() -> String {
    "DRAFT".into()
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            id: None,
            version: default_guardrail_version(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ToolGatewayConfig {
    /// MCP endpoint exposing personalisation tools (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_url: Option<String>,

    /// Send a bearer token to the gateway
    #[serde(default)]
    pub auth_required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for ToolGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolGatewayConfig")
            .field("mcp_url", &self.mcp_url)
            .field("auth_required", &self.auth_required)
            .field("auth_token", &redact(&self.auth_token))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Foundation model name
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// OpenAI-compatible endpoint that drives reasoning sessions
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Tool-call rounds allowed per reasoning session
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
}

fn default_model_name() -> String {
    "claude-3-7-sonnet".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.1
}
fn default_llm_url() -> String {
    "http://localhost:4000/v1".into()
}
fn default_max_tool_iterations() -> u32 {
    8
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_url: default_llm_url(),
            api_key: None,
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("max_tool_iterations", &self.max_tool_iterations)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `$SCOUT_CONFIG` (or the default path) and
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SCOUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&path)?;
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AWS_REGION") {
            self.aws_region = v;
        }
        if let Some(v) = get("KNOWLEDGE_BASE_ID") {
            self.knowledge_base.id = Some(v);
        }
        if let Some(v) = get("KNOWLEDGE_BASE_URL") {
            self.knowledge_base.endpoint = v;
        }
        if let Some(v) = get("KNOWLEDGE_BASE_API_KEY") {
            self.knowledge_base.api_key = Some(v);
        }
        if let Some(v) = get("GUARDRAILS_ID") {
            self.guardrails.id = Some(v);
        }
        if let Some(v) = get("GUARDRAILS_VERSION") {
            self.guardrails.version = v;
        }
        if let Some(v) = get("GATEWAY_MCP_URL") {
            self.tool_gateway.mcp_url = Some(v);
        }
        if let Some(v) = get("GATEWAY_AUTH_REQUIRED") {
            self.tool_gateway.auth_required = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("GATEWAY_AUTH_TOKEN") {
            self.tool_gateway.auth_token = Some(v);
        }
        if let Some(v) = get("AI_MODEL") {
            self.model.name = v;
        }
        if let Some(v) = get("MAX_TOKENS") {
            self.model.max_tokens = parse_env("MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("TEMPERATURE") {
            self.model.temperature = parse_env("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("RESPONSE_TIMEOUT") {
            self.response_timeout_secs = parse_env("RESPONSE_TIMEOUT", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = get("SCOUT_LLM_URL") {
            self.model.api_url = v;
        }
        if let Some(v) = get("SCOUT_LLM_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = get("SCOUT_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("SCOUT_PORT") {
            self.server.port = parse_env("SCOUT_PORT", &v)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".scout")
    }

    /// Validate value ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_tokens must be > 0".into(),
            ));
        }
        if self.response_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "response_timeout_secs must be > 0".into(),
            ));
        }
        if self.knowledge_base.number_of_results == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge_base.number_of_results must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Names of required settings that are unset, in a fixed order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let required = [
            ("KNOWLEDGE_BASE_ID", &self.knowledge_base.id),
            ("GATEWAY_MCP_URL", &self.tool_gateway.mcp_url),
            ("GUARDRAILS_ID", &self.guardrails.id),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }

    /// Fully qualified identifier of the configured foundation model.
    pub fn model_arn(&self) -> String {
        format!(
            "arn:aws:bedrock:{}::foundation-model/{}",
            self.aws_region, self.model.name
        )
    }

    /// The per-call timeout as a Duration.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// The gateway bearer token, when authentication is switched on.
    pub fn gateway_bearer_token(&self) -> Option<&str> {
        if self.tool_gateway.auth_required {
            self.tool_gateway.auth_token.as_deref()
        } else {
            None
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            aws_region: default_region(),
            knowledge_base: KnowledgeBaseConfig::default(),
            guardrails: GuardrailsConfig::default(),
            tool_gateway: ToolGatewayConfig::default(),
            model: ModelConfig::default(),
            response_timeout_secs: default_response_timeout(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            key,
            value: value.to_string(),
        })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
