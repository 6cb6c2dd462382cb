//! Main entry point for the API host

use api_host::{config::Config, Error, Host, Result};
use clap::Parser;
use common::logging::init_logging;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "api-host", about = "Modular HTTP API host", version, author)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long)]
    gen_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle config generation before logging so stdout stays clean
    if args.gen_config {
        let example_config = Config::generate_example()?;
        println!("{example_config}");
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    let level = if args.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_logging(
        level,
        config
            .logging
            .format
            .resolve(config.environment.is_development()),
    )
    .map_err(|e| Error::Internal {
        message: format!("Failed to initialize logging: {e}"),
    })?;

    info!(
        environment = config.environment.as_str(),
        "Starting API host v{}",
        api_host::VERSION
    );

    let host = Host::builder(config).build().await?;
    info!(modules = ?host.modules(), "API host initialized");

    match host.run().await {
        Ok(()) => {
            info!("API host shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("API host error: {}", e);
            Err(e)
        }
    }
}
