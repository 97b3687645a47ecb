//! `breathwise serve`: Start the HTTP API server.

use breathwise_providers::build_from_config;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let registry = build_from_config(&config);
    if registry.is_empty() {
        return Err("No data sources configured; enable open_meteo or add a feed".into());
    }

    println!("🌬️  Breathwise Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Sources:   {}", registry.list().join(", "));
    println!(
        "   Admin:     {}",
        if config.gateway.admin_token.is_some() { "token required" } else { "open" }
    );

    breathwise_gateway::start(config, registry).await?;

    Ok(())
}
