//! Command-line interface.

use clap::{Parser, Subcommand};
use depot_core::PermissionCatalog;

use crate::config::ServerConfig;
use crate::{Error, Result};

/// Depot permission engine server
#[derive(Parser, Debug)]
#[command(name = "depot", version)]
#[command(about = "Effective permission resolution and warehouse scoping for Depot", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "DEPOT_CONFIG")]
    pub config: Option<String>,

    /// Subcommand; `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server
    Serve,
    /// Inspect configuration
    Config {
        /// What to show
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print the built-in permission catalog
    Catalog {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Show the effective configuration, secrets masked
    Show,
}

/// Show the resolved config file path.
pub fn cmd_config_path(config_path: Option<&str>) -> Result<()> {
    match ServerConfig::resolve_config_path(config_path) {
        Some(path) => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(file does not exist; built-in defaults apply)");
            }
            Ok(())
        }
        None => Err(Error::config(
            "Could not determine config directory for this platform",
        )),
    }
}

/// Print the effective configuration.
pub fn cmd_config_show(config_path: Option<&str>) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    print!("{}", config.to_redacted_toml()?);
    Ok(())
}

/// Print the built-in catalog.
pub fn cmd_catalog(json: bool) -> Result<()> {
    print!("{}", render_catalog(&PermissionCatalog::builtin(), json)?);
    Ok(())
}

fn render_catalog(catalog: &PermissionCatalog, json: bool) -> Result<String> {
    if json {
        let rows: Vec<_> = catalog.iter().collect();
        return serde_json::to_string_pretty(&rows)
            .map(|s| s + "\n")
            .map_err(|e| Error::config(e.to_string()));
    }

    let mut out = String::new();
    for (category, permissions) in catalog.by_category() {
        out.push_str(&format!("[{category}]\n"));
        for p in permissions {
            out.push_str(&format!("  {:<22} {}\n", p.code.as_str(), p.display_name));
        }
    }
    Ok(out)
}
