//! Error types for depot-server

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for depot-server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or starting the server.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error with the path involved
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or socket involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Error from depot-acl
    #[error("ACL error: {0}")]
    Acl(#[from] depot_acl::Error),

    /// Error from depot-auth
    #[error("Auth error: {0}")]
    Auth(#[from] depot_auth::AuthError),
}

impl Error {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates an I/O error tagged with a path.
    pub fn io_with_path(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
