//! `scout search`: run one request locally and print the response.

use scout_config::AppConfig;
use scout_core::search::SearchRequest;

pub async fn run(
    config: AppConfig,
    query: String,
    user_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = scout_gateway::build_orchestrator(&config)?;

    let request = match user_id {
        Some(user_id) => SearchRequest::for_user(query, user_id),
        None => SearchRequest::new(query),
    };

    let response = orchestrator.search(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
