//! `scout doctor`: diagnose configuration and collaborator health.

use scout_config::AppConfig;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scout doctor");
    println!("============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok    Config file {}", config_path.display());
    } else {
        println!("  info  No config file; using defaults and environment");
    }

    let missing = config.missing_required();
    if missing.is_empty() {
        println!("  ok    Required settings present");
    } else {
        for key in &missing {
            println!("  fail  {key} is not set");
        }
        issues += missing.len();
    }

    if config.tool_gateway.auth_required && config.tool_gateway.auth_token.is_none() {
        println!("  warn  Gateway auth required but GATEWAY_AUTH_TOKEN is not set");
        issues += 1;
    }

    let orchestrator = scout_gateway::build_orchestrator(&config)?;
    let report = orchestrator.health().await;

    if report.knowledge_base {
        println!("  ok    Knowledge base reachable");
    } else {
        println!("  fail  Knowledge base unreachable");
        issues += 1;
    }

    if report.personalisation {
        println!("  ok    Tool gateway reachable");
    } else {
        println!("  fail  Tool gateway unreachable or not configured");
        issues += 1;
    }

    if report.reasoning_model {
        println!("  ok    Reasoning model reachable");
    } else {
        println!("  fail  Reasoning model unreachable");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  All checks passed");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
