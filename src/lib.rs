//! Library crate for port-sweep: a bounded-concurrency TCP connect scanner.
pub mod dialer;
pub mod error;
pub mod logging;
pub mod output;
pub mod pool;
pub mod ports;
pub mod progress;
pub mod resolve;
pub mod scanner;
pub mod services;
pub mod sink;
pub mod types;

pub use error::{LookupError, OutputError, ScanError, ValidationError};
pub use scanner::{ScanPhase, Scanner};
pub use types::{OpenPort, PortOutcome, ProgressState, ScanReport, ScanRequest, ScanResult, ScanTarget};
