//! Personalisation: discover the gateway's tools and let a reasoning
//! session decide which of them to use for this user and topic.
//!
//! Every outcome is a [`PersonalisationResult`]. Failures are logged and
//! reported as an unsuccessful, empty result. The gateway session is closed
//! before returning on every path, including a panic inside the session.

use futures::FutureExt;
use scout_core::discovery::{DiscoverySession, ToolDiscovery};
use scout_core::error::{DiscoveryError, Error};
use scout_core::search::PersonalisationResult;
use scout_core::tool::ToolRegistry;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::reasoning::{ReasoningAgent, ReasoningSession};

/// `tool_used` marker for content produced by a reasoning session.
pub const TOOL_MARKER: &str = "reasoning_agent_with_gateway_tools";

pub struct PersonalisationResolver {
    discovery: Option<Arc<dyn ToolDiscovery>>,
    agent: Arc<dyn ReasoningAgent>,
    timeout: Duration,
}

/// How a session that ran to completion ended.
enum Outcome {
    Content(String),
    NoTools,
}

impl PersonalisationResolver {
    pub fn new(
        discovery: Option<Arc<dyn ToolDiscovery>>,
        agent: Arc<dyn ReasoningAgent>,
        timeout: Duration,
    ) -> Self {
        Self {
            discovery,
            agent,
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.discovery.is_some()
    }

    async fn bounded<T, E, F>(&self, what: &'static str, call: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<Error>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                warn!(call = what, timeout_secs = self.timeout.as_secs(), "Gateway call timed out");
                Err(DiscoveryError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
                .into())
            }
        }
    }

    /// Fetch personalised content for `user_id` about `topic`. Never fails.
    pub async fn get_personalised_content(&self, user_id: &str, topic: &str) -> PersonalisationResult {
        let user_id = user_id.trim();
        let topic = topic.trim();
        if user_id.is_empty() || topic.is_empty() {
            warn!("Personalisation skipped: blank user id or topic");
            return PersonalisationResult::unsuccessful();
        }

        let Some(discovery) = &self.discovery else {
            debug!("Personalisation skipped: no tool gateway configured");
            return PersonalisationResult::unsuccessful();
        };

        info!(user_id, topic_len = topic.len(), "Resolving personalised content");

        let session = match self.bounded("connect", discovery.connect()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(endpoint = discovery.endpoint(), error = %e, "Could not open gateway session");
                return PersonalisationResult::unsuccessful();
            }
        };

        let outcome = AssertUnwindSafe(self.resolve(session.as_ref(), user_id, topic))
            .catch_unwind()
            .await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close gateway session");
        }

        match outcome {
            Ok(Ok(Outcome::Content(text))) => {
                let result = PersonalisationResult::produced(&text, TOOL_MARKER);
                if result.success {
                    info!(content_len = result.content.len(), "Personalised content produced");
                } else {
                    info!("Reasoning session returned no personalised content");
                }
                result
            }
            Ok(Ok(Outcome::NoTools)) => {
                info!("Tool gateway offered no tools");
                PersonalisationResult::unsuccessful()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Personalisation failed");
                PersonalisationResult::unsuccessful()
            }
            Err(_) => {
                error!("Personalisation panicked");
                PersonalisationResult::unsuccessful()
            }
        }
    }

    async fn resolve(
        &self,
        session: &dyn DiscoverySession,
        user_id: &str,
        topic: &str,
    ) -> Result<Outcome, Error> {
        let tools = self.bounded("tools/list", session.list_tools()).await?;
        if tools.is_empty() {
            return Ok(Outcome::NoTools);
        }

        let registry: ToolRegistry = tools.into_iter().collect();
        debug!(tools = ?registry.names(), "Starting personalisation session");

        let reasoning = ReasoningSession {
            system_prompt: system_prompt(user_id, topic),
            prompt: format!("Find personalised content for user {user_id} related to: {topic}"),
            tools: registry,
        };

        self.bounded("reasoning", self.agent.run(reasoning))
            .await
            .map(Outcome::Content)
    }

    /// True when the reasoning model answers its health check.
    pub async fn model_health_check(&self) -> bool {
        self.agent.health_check().await
    }

    /// True when the gateway accepts a session and lists its tools.
    pub async fn health_check(&self) -> bool {
        let Some(discovery) = &self.discovery else {
            warn!("No tool gateway configured, personalisation health check failed");
            return false;
        };

        let session = match self.bounded("connect", discovery.connect()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Personalisation health check failed");
                return false;
            }
        };

        let listed = self.bounded("tools/list", session.list_tools()).await;
        if let Err(e) = session.close().await {
            debug!(error = %e, "Failed to close health check session");
        }

        match listed {
            Ok(tools) => {
                debug!(tools = tools.len(), "Personalisation health check passed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Personalisation health check failed");
                false
            }
        }
    }
}

fn system_prompt(user_id: &str, topic: &str) -> String {
    format!(
        "You find personalised content for a single user.\n\
         \n\
         User ID: {user_id}\n\
         Search topic: {topic}\n\
         \n\
         Use the available tools to look up this user's preferences, history or \
         recommendations that relate to the search topic. Pass the user ID to any tool \
         that accepts one. When several tools could apply, pick the one that best fits \
         the topic. Answer with the personalised content only. If the tools return \
         nothing relevant for this user, say plainly that no personalised content is \
         available."
    )
}
