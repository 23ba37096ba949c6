//! HTTP entrypoint for Scout.
//!
//! Exposes the container-runtime contract (`POST /invocations`,
//! `GET /ping`) plus a collaborator health check at `GET /health`.
//!
//! Built on Axum; every invocation answers `200` with the three-field
//! search response, whatever happened inside the pipeline.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use scout_agent::orchestrator::FORMAT_ERROR_MESSAGE;
use scout_agent::{
    HealthReport, KnowledgeRetriever, PersonalisationResolver, RetrievalSettings,
    SearchOrchestrator, ToolCallingAgent,
};
use scout_config::AppConfig;
use scout_core::discovery::ToolDiscovery;
use scout_core::search::SearchResponse;
use scout_core::Error;
use scout_providers::{HttpKnowledgeBase, OpenAiCompatProvider};
use scout_tools::McpGateway;

/// Request bodies above this size are rejected before reaching the pipeline.
const MAX_BODY_BYTES: usize = 1024 * 1024;

type SharedState = Arc<SearchOrchestrator>;

/// Build the Axum router with all gateway routes.
pub fn build_router(orchestrator: SharedState) -> Router {
    Router::new()
        .route("/invocations", post(invocations_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Construct the collaborators once and wire them into an orchestrator.
///
/// Missing required settings are not an error here: the orchestrator
/// answers every request with the configuration message until they are set.
pub fn build_orchestrator(config: &AppConfig) -> Result<SearchOrchestrator, Error> {
    let knowledge_base = Arc::new(HttpKnowledgeBase::from_config(config)?);
    let retriever = KnowledgeRetriever::new(knowledge_base, RetrievalSettings::from_config(config));

    let discovery = McpGateway::from_config(config)?
        .map(|gateway| Arc::new(gateway) as Arc<dyn ToolDiscovery>);
    let provider = Arc::new(OpenAiCompatProvider::from_config(config)?);
    let agent = Arc::new(ToolCallingAgent::from_config(provider, config));
    let resolver = PersonalisationResolver::new(discovery, agent, config.response_timeout());

    Ok(SearchOrchestrator::new(config.clone(), retriever, resolver))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let missing = config.missing_required();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Required settings are missing; requests will be refused");
    }

    let orchestrator = Arc::new(build_orchestrator(&config)?);
    let app = build_router(orchestrator);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

/// Unreadable bodies, oversized ones included, get the format message
/// rather than a bare status.
async fn invocations_handler(
    State(orchestrator): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<SearchResponse> {
    match body {
        Ok(body) => Json(orchestrator.invoke_bytes(&body).await),
        Err(rejection) => {
            tracing::warn!(status = %rejection.status(), error = %rejection, "Unreadable request body");
            Json(SearchResponse::message(FORMAT_ERROR_MESSAGE))
        }
    }
}

#[derive(Serialize)]
struct PingResponse {
    status: &'static str,
    version: &'static str,
}

async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        status: "Healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health_handler(
    State(orchestrator): State<SharedState>,
) -> (StatusCode, Json<HealthReport>) {
    let report = orchestrator.health().await;
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
