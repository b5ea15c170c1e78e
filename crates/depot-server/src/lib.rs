//! Depot server: HTTP surface and CLI for the permission engine.
//!
//! # Modules
//!
//! - [`cli`]: clap command definitions and handlers
//! - [`config`]: TOML configuration with `DEPOT_*` overrides
//! - [`routes`]: axum router and handlers
//! - [`server`]: store selection and startup
//! - [`telemetry`]: logging setup
//! - [`error`]: Error types and Result alias

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Error, Result};
