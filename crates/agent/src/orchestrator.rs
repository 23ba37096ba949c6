//! The request pipeline: configuration check, validation, retrieval and
//! personalisation, then assembly.
//!
//! Callers always get a [`SearchResponse`]. Configuration and input faults
//! short-circuit to a fixed message in `summary`; upstream faults are
//! absorbed by the stages themselves; anything else, panics included, is
//! caught here and reported with a generic message.

use futures::FutureExt;
use scout_config::AppConfig;
use scout_core::error::{Error, FaultCategory, InputError};
use scout_core::search::{RetrievalResult, SearchRequest, SearchResponse};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use crate::assembler::assemble;
use crate::personalisation::PersonalisationResolver;
use crate::retriever::KnowledgeRetriever;
use crate::validation::{self, ValidatedRequest};

pub const CONFIGURATION_ERROR_MESSAGE: &str =
    "Service configuration error. Please contact support if the problem persists.";
pub const FORMAT_ERROR_MESSAGE: &str =
    "Invalid request format. Please provide a valid search query.";
pub const USER_ID_ERROR_MESSAGE: &str =
    "Invalid user identifier. Please check the user_id field.";
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An error occurred while processing your request. Please try again.";

/// Longest query prefix written to logs.
const LOG_QUERY_CHARS: usize = 100;

/// The user-facing message for a failed request.
pub fn user_message(err: &Error) -> &'static str {
    match (err.category(), err) {
        (FaultCategory::Configuration, _) => CONFIGURATION_ERROR_MESSAGE,
        (FaultCategory::Input, Error::Input(InputError::InvalidUserId(_))) => USER_ID_ERROR_MESSAGE,
        (FaultCategory::Input, _) => FORMAT_ERROR_MESSAGE,
        (FaultCategory::Upstream | FaultCategory::Internal, _) => INTERNAL_ERROR_MESSAGE,
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_QUERY_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Collaborator health, as reported by `/health` and `scout doctor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub knowledge_base: bool,
    pub personalisation: bool,
    pub reasoning_model: bool,
    pub missing_config: Vec<&'static str>,
}

pub struct SearchOrchestrator {
    config: AppConfig,
    retriever: KnowledgeRetriever,
    resolver: PersonalisationResolver,
}

impl SearchOrchestrator {
    pub fn new(
        config: AppConfig,
        retriever: KnowledgeRetriever,
        resolver: PersonalisationResolver,
    ) -> Self {
        Self {
            config,
            retriever,
            resolver,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn check_config(&self) -> Result<(), Error> {
        let missing = self.config.missing_required();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::Config {
            message: format!("missing required settings: {}", missing.join(", ")),
        })
    }

    /// Handle an already-decoded request.
    pub async fn search(&self, request: SearchRequest) -> SearchResponse {
        self.guarded(async {
            self.check_config()?;
            self.pipeline(&request).await
        })
        .await
    }

    /// Handle a JSON invocation payload.
    pub async fn invoke(&self, payload: &Value) -> SearchResponse {
        self.guarded(async {
            self.check_config()?;
            let request = validation::parse_payload(payload)?;
            self.pipeline(&request).await
        })
        .await
    }

    /// Handle a raw request body.
    pub async fn invoke_bytes(&self, body: &[u8]) -> SearchResponse {
        self.guarded(async {
            self.check_config()?;
            let request = validation::parse_bytes(body)?;
            self.pipeline(&request).await
        })
        .await
    }

    /// Run `work`, turning every error and panic into a response.
    async fn guarded<F>(&self, work: F) -> SearchResponse
    where
        F: Future<Output = Result<SearchResponse, Error>>,
    {
        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                match e.category() {
                    FaultCategory::Configuration => error!(error = %e, "Service misconfigured"),
                    FaultCategory::Input => warn!(error = %e, "Rejected search request"),
                    FaultCategory::Upstream | FaultCategory::Internal => {
                        error!(error = %e, "Search request failed")
                    }
                }
                SearchResponse::message(user_message(&e))
            }
            Err(panic) => {
                let e = Error::Internal(format!("panic: {}", panic_detail(&*panic)));
                error!(error = %e, "Search request panicked");
                SearchResponse::message(user_message(&e))
            }
        }
    }

    async fn pipeline(&self, request: &SearchRequest) -> Result<SearchResponse, Error> {
        let ValidatedRequest { query, user_id } = validation::validate(request)?;

        info!(
            query = %preview(&query),
            query_len = query.chars().count(),
            personalised = user_id.is_some(),
            "Processing search request"
        );

        let (retrieval, personalisation) = match &user_id {
            Some(user_id) => {
                let (retrieval, personalisation) = tokio::join!(
                    self.retrieve(&query),
                    self.resolver.get_personalised_content(user_id, &query),
                );
                (retrieval, Some(personalisation))
            }
            None => (self.retrieve(&query).await, None),
        };

        let response = assemble(retrieval, personalisation);
        info!(
            links = response.links.len(),
            personalised = !response.personalised.is_empty(),
            "Search request processed"
        );
        Ok(response)
    }

    /// Retrieval that panicked is reported as absent, leaving the other
    /// stage's result intact.
    async fn retrieve(&self, query: &str) -> Option<RetrievalResult> {
        match AssertUnwindSafe(self.retriever.retrieve_and_generate(query))
            .catch_unwind()
            .await
        {
            Ok(result) => Some(result),
            Err(_) => {
                error!("Knowledge retrieval panicked");
                None
            }
        }
    }

    /// Check every collaborator concurrently.
    pub async fn health(&self) -> HealthReport {
        let (knowledge_base, personalisation, reasoning_model) = tokio::join!(
            self.retriever.health_check(),
            self.resolver.health_check(),
            self.resolver.model_health_check(),
        );
        let missing_config = self.config.missing_required();
        HealthReport {
            healthy: knowledge_base
                && personalisation
                && reasoning_model
                && missing_config.is_empty(),
            knowledge_base,
            personalisation,
            reasoning_model,
            missing_config,
        }
    }
}
