//! `assistline serve`: start the HTTP gateway.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("Starting assistline gateway on {}:{}", config.gateway.host, config.gateway.port);
    assistline_gateway::start(config).await
}
