//! `scout serve`: start the HTTP gateway.

use scout_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("Scout gateway");
    println!("   Listening: {}:{}", config.server.host, config.server.port);
    println!("   Model:     {}", config.model.name);

    scout_gateway::start(config).await?;

    Ok(())
}
