//! Error types for gcamreader.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for gcamreader operations.
#[derive(Error, Debug)]
pub enum GcamError {
    /// Database connection errors (missing basex files, unreachable server, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Batch query document errors (malformed XML, missing titles, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Remote server rejected the supplied credentials.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Query execution errors scoped to a single query.
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid config file, bad paths, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors while writing results.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GcamError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a parse error with the given message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Creates an authentication error with the given message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Parse(_) => "Parse Error",
            Self::Authentication(_) => "Authentication Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using GcamError.
pub type Result<T> = std::result::Result<T, GcamError>;
