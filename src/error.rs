//! Error types for the scanner library.

use std::path::PathBuf;

use thiserror::Error;

/// Input rejected before any network activity takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Host name could not be resolved to an address.
    #[error("'{0}' is not a valid host")]
    InvalidHost(String),

    /// Port value is not a number.
    #[error("invalid port value: {0}")]
    InvalidPort(String),

    /// Port value outside 1..=65535.
    #[error("ports must be integers between 1 and 65535 (got {0})")]
    PortOutOfRange(u32),

    /// Start port greater than end port.
    #[error("start port {start} must be less than or equal to end port {end}")]
    InvertedRange { start: u16, end: u16 },

    #[error("thread count must be greater than zero")]
    ZeroConcurrency,

    #[error("connection timeout must be greater than zero")]
    ZeroTimeout,
}

/// Failure of a scan as a whole. Only the `Rejected` state is reachable:
/// once workers are running the scan always completes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("scan rejected: {0}")]
    Rejected(#[from] ValidationError),
}

/// Service-name lookup failure. Collapsed to `"unknown"` by the dialer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no service registered for port {0}")]
    NotFound(u16),

    #[error("service database unavailable: {0}")]
    Unavailable(String),
}

/// Persisting scan results failed after the scan itself completed.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write CSV results to {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write JSON report to {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
