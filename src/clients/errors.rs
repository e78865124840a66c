//! Error types for request dispatch.
//!
//! The client distinguishes between failures to complete a request and
//! rejections by the server:
//!
//! - [`TransportError`]: the request could not be completed (connection
//!   refused, reset, broken pipe, ...). Carries an [`ErrorCode`].
//! - [`ErrorResult`](crate::response::ErrorResult): the server understood
//!   the request but answered with an `error` payload.
//! - [`InvalidHttpRequestError`]: the request failed validation before it
//!   was sent.
//! - [`HttpError`]: unified error type encompassing all of the above plus
//!   body decode failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use couch_api::{HttpError, ErrorCode};
//!
//! match client.request(request).await {
//!     Ok(reply) => println!("{reply:?}"),
//!     Err(HttpError::Couch(e)) => println!("{} {}: {:?}", e.status(), e.error(), e.reason()),
//!     Err(HttpError::Transport(e)) if e.code() == &ErrorCode::ConnRefused => {
//!         println!("no server reachable");
//!     }
//!     Err(e) => println!("request failed: {e}"),
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::response::ErrorResult;

/// Message used for connection resets, including normalized hang-ups.
pub const CONNRESET_MESSAGE: &str = "ECONNRESET, Client reset by peer";

/// Machine-readable code of a transport-level failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The peer reset the connection (`ECONNRESET`).
    ConnReset,
    /// Writing to a closed connection (`EPIPE`).
    BrokenPipe,
    /// Nothing is listening at the server address (`ECONNREFUSED`).
    ConnRefused,
    /// The connection closed before any response arrived.
    ///
    /// Reported by transports; the dispatcher normalizes it to
    /// [`ErrorCode::ConnReset`] before applying retry policy.
    HangUp,
    /// Any other failure, identified by the transport's native code.
    Other(String),
}

impl ErrorCode {
    /// Returns the conventional string code, e.g. `"ECONNRESET"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnReset => "ECONNRESET",
            Self::BrokenPipe => "EPIPE",
            Self::ConnRefused => "ECONNREFUSED",
            Self::HangUp => "EHANGUP",
            Self::Other(code) => code,
        }
    }

    /// Maps an I/O error kind to a code.
    #[must_use]
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused => Self::ConnRefused,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => Self::ConnReset,
            io::ErrorKind::BrokenPipe => Self::BrokenPipe,
            io::ErrorKind::UnexpectedEof => Self::HangUp,
            io::ErrorKind::TimedOut => Self::Other("ETIMEDOUT".to_string()),
            io::ErrorKind::NotFound => Self::Other("ENOTFOUND".to_string()),
            _ => Self::Other("EIO".to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request could not be completed at the transport level.
///
/// # Example
///
/// ```rust
/// use couch_api::clients::{ErrorCode, TransportError};
///
/// let error = TransportError::new(ErrorCode::HangUp, "socket hang up").normalized();
/// assert_eq!(error.code(), &ErrorCode::ConnReset);
/// assert!(error.is_retryable());
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} ({code})")]
pub struct TransportError {
    code: ErrorCode,
    message: String,
}

impl TransportError {
    /// Creates a transport error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` for broken pipes and connection resets.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::BrokenPipe | ErrorCode::ConnReset)
    }

    /// Returns `true` when the server refused the connection.
    #[must_use]
    pub const fn triggers_failover(&self) -> bool {
        matches!(self.code, ErrorCode::ConnRefused)
    }

    /// Rewrites a hang-up into a standard connection reset.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.code == ErrorCode::HangUp || self.message == "socket hang up" {
            Self::new(ErrorCode::ConnReset, CONNRESET_MESSAGE)
        } else {
            self
        }
    }

    /// Classifies an error from the reqwest transport.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let message = err.to_string();
        let mut source: Option<&(dyn StdError + 'static)> = err.source();

        while let Some(current) = source {
            if let Some(io_err) = current.downcast_ref::<io::Error>() {
                return Self::new(ErrorCode::from_io_kind(io_err.kind()), message);
            }
            let text = current.to_string();
            if text.contains("connection closed before message completed") {
                return Self::new(ErrorCode::HangUp, message);
            }
            if text.contains("dns error") {
                return Self::new(ErrorCode::Other("ENOTFOUND".to_string()), message);
            }
            source = current.source();
        }

        let code = if err.is_timeout() {
            "ETIMEDOUT"
        } else if err.is_body() || err.is_decode() {
            "EBODY"
        } else {
            "EUNKNOWN"
        };
        Self::new(ErrorCode::Other(code.to_string()), message)
    }
}

/// Error returned when a request fails validation before dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A body was supplied for a method that cannot carry one.
    #[error("Cannot send a body with {method} requests.")]
    BodyNotAllowed {
        /// The HTTP method of the request.
        method: String,
    },

    /// The request body could not be encoded as JSON.
    #[error("Failed to encode request body as JSON: {reason}")]
    InvalidBody {
        /// The serializer's message.
        reason: String,
    },
}

/// Unified error type for all request failures.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with an `error` payload.
    #[error(transparent)]
    Couch(#[from] ErrorResult),

    /// The response body was not valid JSON.
    #[error("Failed to parse response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The response did not have the shape the endpoint returns.
    #[error("Unexpected response shape, expected {expected}")]
    UnexpectedResponse {
        /// The shape that was expected.
        expected: &'static str,
    },

    /// The event stream closed before the request finished.
    #[error("Request ended without a response")]
    Incomplete,
}

impl HttpError {
    /// Returns the HTTP status of an application-level error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Couch(e) => Some(e.status()),
            _ => None,
        }
    }

    /// Returns the code of a transport-level error.
    #[must_use]
    pub const fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Transport(e) => Some(e.code()),
            _ => None,
        }
    }
}
