//! assistline CLI, the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `redact`  Scrub text from an argument or stdin
//! - `status`  Show the resolved configuration
//! - `doctor`  Validate configuration and redaction patterns

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "assistline",
    about = "assistline: real-time agent assist for contact centers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.assistline/config.toml)
    #[arg(short, long, global = true, env = "ASSISTLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Redact PII/PHI from TEXT (or stdin when omitted)
    Redact {
        text: Option<String>,
    },

    /// Show the resolved configuration (secrets hidden)
    Status,

    /// Validate configuration, redaction patterns and providers
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `redact` output stays pipeable.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Redact { text } => commands::redact::run(config_path, text)?,
        Commands::Status => commands::status::run(config_path)?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
