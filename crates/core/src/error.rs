//! Error types for the Scout domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each collaborator has
//! its own error enum; [`Error::category`] folds them into the four fault
//! classes the request pipeline reasons about.

use thiserror::Error;

/// The top-level error type for all Scout operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request input ---
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    // --- LLM provider ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge base ---
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Tool discovery gateway ---
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    // --- Tool execution ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure, as seen by the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCategory {
    /// Missing or invalid operator-supplied settings.
    Configuration,
    /// The caller sent something unusable.
    Input,
    /// An external service failed, timed out or answered nonsense.
    Upstream,
    /// Anything nobody anticipated.
    Internal,
}

impl Error {
    /// Map this error onto the pipeline's fault taxonomy.
    pub fn category(&self) -> FaultCategory {
        match self {
            Error::Input(_) => FaultCategory::Input,
            Error::Config { .. } => FaultCategory::Configuration,
            Error::Provider(_) | Error::Knowledge(_) | Error::Discovery(_) | Error::Tool(_) => {
                FaultCategory::Upstream
            }
            Error::Internal(_) => FaultCategory::Internal,
        }
    }
}

// --- Bounded context errors ---

/// Rejections produced while validating a search request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Knowledge base not configured: {0}")]
    NotConfigured(String),

    #[error("Knowledge base request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Knowledge base throttled the request")]
    Throttled,

    #[error("Knowledge base request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("Failed to connect to tool gateway: {0}")]
    Connection(String),

    #[error("Tool gateway returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool gateway protocol violation: {0}")]
    Protocol(String),

    #[error("Tool gateway session already closed")]
    SessionClosed,

    #[error("Tool gateway call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_error_displays_status() {
        let err = Error::Knowledge(KnowledgeError::ApiError {
            status_code: 503,
            message: "Service unavailable".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service unavailable"));
    }

    #[test]
    fn input_errors_are_input_faults() {
        let err: Error = InputError::InvalidUserId("abc@123".into()).into();
        assert_eq!(err.category(), FaultCategory::Input);
    }

    #[test]
    fn collaborator_errors_are_upstream_faults() {
        let errors: Vec<Error> = vec![
            ProviderError::Timeout("30s".into()).into(),
            KnowledgeError::Throttled.into(),
            DiscoveryError::SessionClosed.into(),
            ToolError::NotFound("profile".into()).into(),
        ];
        for err in errors {
            assert_eq!(err.category(), FaultCategory::Upstream, "{err}");
        }
    }

    #[test]
    fn config_and_internal_categories() {
        let config = Error::Config {
            message: "KNOWLEDGE_BASE_ID".into(),
        };
        assert_eq!(config.category(), FaultCategory::Configuration);
        assert_eq!(
            Error::Internal("boom".into()).category(),
            FaultCategory::Internal
        );
    }
}
