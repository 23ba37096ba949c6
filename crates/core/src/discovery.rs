//! Tool discovery: scoped connections to the personalisation tool gateway.
//!
//! A [`ToolDiscovery`] is a long-lived, shareable handle to the gateway. Each
//! request opens its own [`DiscoverySession`], lists the tools on offer, hands
//! them to a reasoning session, and closes the session before returning.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::DiscoveryError;
use crate::tool::Tool;

/// A handle to a tool gateway that can open sessions.
#[async_trait]
pub trait ToolDiscovery: Send + Sync {
    /// The gateway endpoint, for logs and health output.
    fn endpoint(&self) -> &str;

    /// Open a new session.
    async fn connect(&self) -> Result<Box<dyn DiscoverySession>, DiscoveryError>;
}

/// An open gateway session.
///
/// Tools returned by [`list_tools`](DiscoverySession::list_tools) stay usable
/// until [`close`](DiscoverySession::close) is called.
#[async_trait]
pub trait DiscoverySession: Send + Sync {
    /// List the tools currently offered, in gateway order.
    async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError>;

    /// Release the session. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), DiscoveryError>;
}
