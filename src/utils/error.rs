//! Error types for pika-exporter

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed { addr: String, source: io::Error },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),
}

/// Errors raised by individual commands on an established connection
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected {command} response: {actual}")]
    UnexpectedResponse {
        command: &'static str,
        actual: String,
    },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("unknown type: {key_type} for key: {key}")]
    UnknownKeyType { key_type: String, key: String },

    #[error("Invalid response from SCAN for pattern: {0}")]
    InvalidScan(String),
}

/// Failure to determine the store version from INFO output
#[derive(Error, Debug)]
pub enum VersionParseError {
    #[error("version field '{0}' not found in INFO output")]
    Missing(&'static str),

    #[error("invalid version '{value}': {source}")]
    Invalid {
        value: String,
        source: semver::Error,
    },
}

/// Outcome of one unit of a per-instance scrape
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("new pika client failed: {0}")]
    Connect(#[from] ConnectionError),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("{0}")]
    VersionParse(#[from] VersionParseError),

    #[error("failed to spawn scrape thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("scrape panicked: {0}")]
    Panicked(String),

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ScrapeError>),
}

impl ScrapeError {
    /// Combine two failures reported for the same instance.
    pub fn merge(self, other: ScrapeError) -> ScrapeError {
        let mut errors = match self {
            ScrapeError::Multiple(errors) => errors,
            single => vec![single],
        };
        match other {
            ScrapeError::Multiple(more) => errors.extend(more),
            single => errors.push(single),
        }
        ScrapeError::Multiple(errors)
    }
}

/// Errors from delivering a sample to the exposition layer
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("metric {name}: expected {expected} label values, got {actual}")]
    LabelCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("metric {name} already registered as {existing}")]
    KindConflict { name: String, existing: &'static str },

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Errors building the rule registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid version range `{range}`: {source}")]
    InvalidVersionRange {
        range: String,
        source: semver::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExporterError>;
