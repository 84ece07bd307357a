use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ports::PortRange;

/// Default number of concurrent workers.
pub const DEFAULT_THREADS: usize = 100;

/// Default per-attempt connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Raw, unvalidated scan parameters as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub host: String,
    pub start: u32,
    pub end: u32,
    pub threads: usize,
    pub timeout: Duration,
}

impl ScanRequest {
    pub fn new(host: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            host: host.into(),
            start,
            end,
            threads: DEFAULT_THREADS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a request from textual port bounds, rejecting non-numeric and
    /// out-of-range values.
    pub fn parse(host: impl Into<String>, start: &str, end: &str) -> Result<Self, ValidationError> {
        let range = PortRange::parse(start, end)?;
        Ok(Self::new(host, u32::from(range.start()), u32::from(range.end())))
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Validated, immutable input to a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub host: String,
    pub address: IpAddr,
    pub range: PortRange,
    pub concurrency: usize,
    pub timeout: Duration,
}

/// Outcome of a single connection attempt. Produced exactly once per port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortOutcome {
    Open(String),
    Closed,
    /// Unexpected I/O failure. Counts as not-open.
    Error(String),
}

impl PortOutcome {
    pub fn is_open(&self) -> bool {
        matches!(self, PortOutcome::Open(_))
    }
}

/// One open port and the service name registered for it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OpenPort {
    pub port: u16,
    pub service: String,
}

impl OpenPort {
    pub fn new(port: u16, service: impl Into<String>) -> Self {
        Self {
            port,
            service: service.into(),
        }
    }
}

/// Open ports sorted ascending by port, no duplicates.
pub type ScanResult = Vec<OpenPort>;

/// Snapshot of scan progress.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub completed: u64,
    pub total: u64,
}

impl ProgressState {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Final outcome of a completed scan plus bookkeeping counters.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanReport {
    pub host: String,
    pub address: IpAddr,
    pub start_port: u16,
    pub end_port: u16,
    pub open: ScanResult,
    pub scanned: u64,
    pub total: u64,
    pub errors: u64,
    pub workers: usize,
    pub cancelled: bool,
    pub started_at: String,
    pub finished_at: String,
}
