//! Configuration error types for the CouchDB API client.
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use couch_api::{ConnectionConfig, ConfigError};
//!
//! let result = ConnectionConfig::builder().host("").build();
//! assert!(matches!(result, Err(ConfigError::EmptyHost)));
//! ```

use thiserror::Error;

/// Errors that can occur while resolving a connection configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Host cannot be empty.
    #[error("Host cannot be empty. Please provide a hostname such as '127.0.0.1'.")]
    EmptyHost,

    /// Username cannot be empty when credentials are supplied.
    #[error("Username cannot be empty when credentials are configured.")]
    EmptyUsername,

    /// The connection URL could not be parsed.
    #[error("Invalid connection URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL that was provided.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// The URL scheme is not `http` or `https`.
    #[error("Unsupported scheme '{scheme}'. Expected 'http' or 'https'.")]
    UnsupportedScheme {
        /// The scheme that was provided.
        scheme: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_host_error_message() {
        let message = ConfigError::EmptyHost.to_string();
        assert!(message.contains("Host cannot be empty"));
    }

    #[test]
    fn test_invalid_url_error_includes_url_and_reason() {
        let error = ConfigError::InvalidUrl {
            url: "http://[bad".to_string(),
            reason: "invalid IPv6 address".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("http://[bad"));
        assert!(message.contains("invalid IPv6 address"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::UnsupportedScheme {
            scheme: "ftp".to_string(),
        };
        let _: &dyn std::error::Error = &error;
    }
}
