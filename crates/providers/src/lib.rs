//! HTTP clients for Scout's external collaborators.
//!
//! - [`OpenAiCompatProvider`] drives reasoning sessions through any
//!   OpenAI-compatible `/chat/completions` endpoint.
//! - [`HttpKnowledgeBase`] calls a retrieval-and-generation endpoint that
//!   speaks the RetrieveAndGenerate JSON shape.

pub mod knowledge_base;
pub mod openai_compat;

pub use knowledge_base::HttpKnowledgeBase;
pub use openai_compat::OpenAiCompatProvider;
