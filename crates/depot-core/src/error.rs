//! Error types for depot-core

use thiserror::Error;

/// Result type alias for depot-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depot-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An identifier could not be parsed.
    #[error("invalid {kind}: '{value}'")]
    InvalidId {
        /// Kind of identifier (e.g. "warehouse id").
        kind: &'static str,
        /// The offending input.
        value: String,
    },
}

impl Error {
    /// Creates an invalid-identifier error.
    pub fn invalid_id(kind: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidId {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id_display() {
        let e = Error::invalid_id("warehouse id", "abc");
        assert_eq!(e.to_string(), "invalid warehouse id: 'abc'");
    }
}
