//! Tool discovery for Scout.
//!
//! Personalisation tools are not compiled in. They are discovered at
//! request time from a gateway speaking the Model Context Protocol over
//! streamable HTTP, and each one is exposed as a [`scout_core::Tool`].

pub mod mcp;
pub mod rpc;

pub use mcp::{McpGateway, McpSession, McpTool};
