//! Depot CLI
//!
//! Runs the permission server and inspects its configuration.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use depot_server::ServerConfig;
use depot_server::cli::{self, Args, Command, ConfigAction};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = ServerConfig::load(config_path)?;
            depot_server::telemetry::init(&config.logging.level);
            depot_server::server::serve(config).await?;
        }
        Command::Config { action } => match action {
            ConfigAction::Path => cli::cmd_config_path(config_path)?,
            ConfigAction::Show => cli::cmd_config_show(config_path)?,
        },
        Command::Catalog { json } => cli::cmd_catalog(json)?,
    }

    Ok(())
}
