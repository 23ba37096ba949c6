//! The Scout answer synthesis pipeline.
//!
//! A request flows through five stages:
//!
//! 1. **Validate** the query and optional user id ([`validation`])
//! 2. **Retrieve** a summary and citations from the knowledge base ([`retriever`])
//! 3. **Personalise** through gateway tools and a reasoning session, only
//!    when a user id is present, concurrently with retrieval ([`personalisation`])
//! 4. **Assemble** the three-field response ([`assembler`])
//! 5. **Return**, with every failure converted into a well-formed response
//!    ([`orchestrator`])

pub mod assembler;
pub mod orchestrator;
pub mod personalisation;
pub mod reasoning;
pub mod retriever;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::assemble;
pub use orchestrator::{HealthReport, SearchOrchestrator};
pub use personalisation::{PersonalisationResolver, TOOL_MARKER};
pub use reasoning::{ReasoningAgent, ReasoningSession, ToolCallingAgent};
pub use retriever::{KnowledgeRetriever, RetrievalSettings};
pub use validation::{ValidatedRequest, validate};
