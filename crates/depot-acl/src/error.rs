//! Error types for depot-acl

use std::sync::Arc;

use thiserror::Error;

/// Result type alias for depot-acl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving authority.
///
/// Capability probe failures never surface as errors: they degrade the
/// engine to legacy mode. Everything here is a per-request resolution
/// failure and maps to a server error, never to a denial.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from depot-core
    #[error("Core error: {0}")]
    Core(#[from] depot_core::Error),

    /// An authority store could not be read.
    #[error("Store error: {message}")]
    Store {
        /// What was being read
        message: String,
        /// Underlying driver error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The store is missing a table or column the engine relies on.
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// A resolution shared between concurrent callers failed.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    /// Creates a store error with a message.
    pub fn store<S: Into<String>>(message: S) -> Self {
        Error::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a store error with a message and source error.
    pub fn store_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Returns whether retrying the same resolution may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store { .. } => true,
            Error::Shared(inner) => inner.is_retryable(),
            Error::Core(_) | Error::SchemaUnavailable(_) | Error::Config { .. } => false,
        }
    }
}

impl From<Arc<Error>> for Error {
    fn from(err: Arc<Error>) -> Self {
        Error::Shared(err)
    }
}
