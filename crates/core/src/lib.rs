//! # Scout Core
//!
//! Domain types, traits, and error definitions for the Scout answer
//! synthesis service. This crate has **no framework dependencies**: it
//! defines the request/response model and the collaborator contracts
//! that every other crate implements against.
//!
//! ## Collaborators
//!
//! Each external service the pipeline talks to is a trait here:
//! - [`KnowledgeBase`]: retrieval-and-generation over a knowledge corpus
//! - [`ToolDiscovery`]: scoped connections that expose personalisation tools
//! - [`Provider`]: the LLM that drives a reasoning session
//!
//! Implementations live in `scout-providers` and `scout-tools`; tests use
//! scripted stand-ins.

pub mod discovery;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod search;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use discovery::{DiscoverySession, ToolDiscovery};
pub use error::{Error, FaultCategory, Result};
pub use knowledge::{KnowledgeBase, KnowledgeRequest, KnowledgeResponse};
pub use message::{Message, Role, SessionId, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use search::{PersonalisationResult, RetrievalResult, SearchRequest, SearchResponse};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
