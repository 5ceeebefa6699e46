//! Error handling for the mcpforge conversion pipeline.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. The three pipeline failures
//! (fetch, parse, convert) carry distinct message prefixes so a caller can
//! render an actionable message instead of a backtrace.
//!
//! # Examples
//!
//! ```
//! use mcpforge::core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::conversion("no base URL"))
//! }
//!
//! assert!(might_fail().unwrap_err().to_string().starts_with("could not convert"));
//! ```

use thiserror::Error;

/// Result type for mcpforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mcpforge operations
#[derive(Debug, Error)]
pub enum Error {
    /// Non-2xx status, timeout or network failure while talking to a remote host
    #[error("could not fetch: {0}")]
    Fetch(String),

    /// Input that is not valid JSON
    #[error("could not parse: {0}")]
    Parse(String),

    /// Failure while turning a document into a server configuration
    #[error("could not convert: {0}")]
    Conversion(String),

    /// Parameter values rejected by declared constraints
    #[error("validation failed: {0}")]
    Validation(String),

    /// Template engine error
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// Settings file could not be read or understood
    #[error("settings error: {0}")]
    Settings(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new conversion error
    pub fn conversion<S: Into<String>>(msg: S) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Fetch(format!("request timed out: {err}"))
        } else {
            Self::Fetch(err.to_string())
        }
    }
}
