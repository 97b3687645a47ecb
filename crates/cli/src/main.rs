//! Breathwise CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP API server
//! - `score`: Score current conditions for one user
//! - `briefing`: Print a full briefing for one user
//! - `config`: Print the default configuration
//! - `doctor`: Check configuration and source health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "breathwise",
    about = "Breathwise, personalized environmental-health risk briefings",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Score current conditions for a user
    Score {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        user: String,
        /// Use built-in demo sources instead of the network
        #[arg(long)]
        offline: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a briefing for a user
    Briefing {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        user: String,
        /// Forecast horizon for trends
        #[arg(long)]
        horizon_hours: Option<u32>,
        /// Use built-in demo sources instead of the network
        #[arg(long)]
        offline: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as TOML
    Config,

    /// Check configuration and source health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Score {
            lat,
            lon,
            user,
            offline,
            json,
        } => commands::score::run(lat, lon, &user, offline, json).await?,
        Commands::Briefing {
            lat,
            lon,
            user,
            horizon_hours,
            offline,
            json,
        } => commands::briefing::run(lat, lon, &user, horizon_hours, offline, json).await?,
        Commands::Config => commands::config_cmd::show().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
