use std::sync::Arc;
use std::time::Duration;

use ::time::{format_description::well_known, OffsetDateTime};
use tokio_util::sync::CancellationToken;

use crate::dialer::{Dialer, TcpDialer};
use crate::error::{ScanError, ValidationError};
use crate::pool::{worker_count, WorkerPool};
use crate::ports::{PortRange, PortSource};
use crate::progress::{NoProgress, ProgressCounter, ProgressMonitor, ProgressReporter, DEFAULT_POLL_INTERVAL};
use crate::resolve::{HostResolver, SystemResolver};
use crate::sink::ResultSink;
use crate::types::{ScanReport, ScanRequest, ScanTarget};

/// Lifecycle of a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Validating,
    Scanning,
    Finalizing,
    Done,
    Rejected,
}

/// Orchestrates validation, the worker pool and result assembly.
///
/// The dialer and resolver are collaborators so the engine can be driven by
/// fakes; [`Scanner::new`] wires up real TCP and system name resolution.
pub struct Scanner<D = TcpDialer, R = SystemResolver> {
    dialer: Arc<D>,
    resolver: R,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn new() -> Self {
        Self::with_parts(TcpDialer::system(), SystemResolver)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dialer + 'static, R: HostResolver> Scanner<D, R> {
    pub fn with_parts(dialer: D, resolver: R) -> Self {
        Self {
            dialer: Arc::new(dialer),
            resolver,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// How often the progress monitor samples the completion counter.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// External cancellation: workers stop pulling ports once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Check every input and resolve the host. No connection is attempted here.
    pub async fn validate(&self, req: &ScanRequest) -> Result<ScanTarget, ValidationError> {
        let range = PortRange::new(req.start, req.end)?;
        if req.threads == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        if req.timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        let address = self.resolver.resolve(&req.host).await?;
        Ok(ScanTarget {
            host: req.host.clone(),
            address,
            range,
            concurrency: req.threads,
            timeout: req.timeout,
        })
    }

    /// Scan without progress reporting.
    pub async fn scan(&self, req: &ScanRequest) -> Result<ScanReport, ScanError> {
        self.scan_with_progress(req, |_| NoProgress).await
    }

    /// Scan, reporting progress to the reporter built by `make_reporter` once
    /// the total port count is known.
    pub async fn scan_with_progress<P, F>(
        &self,
        req: &ScanRequest,
        make_reporter: F,
    ) -> Result<ScanReport, ScanError>
    where
        P: ProgressReporter,
        F: FnOnce(u64) -> P,
    {
        let started_at = now_rfc3339();
        tracing::info!("Starting scan on {} ports {}-{}", req.host, req.start, req.end);

        enter(ScanPhase::Validating);
        let target = match self.validate(req).await {
            Ok(t) => t,
            Err(e) => {
                enter(ScanPhase::Rejected);
                tracing::warn!("Invalid scan request for {}: {e}", req.host);
                return Err(ScanError::Rejected(e));
            }
        };

        enter(ScanPhase::Scanning);
        let total = target.range.len() as u64;
        let source = Arc::new(PortSource::new(target.range));
        let sink = Arc::new(ResultSink::new());
        let counter = ProgressCounter::new();
        tracing::debug!(
            "{} -> {}, {} workers, timeout {:?}",
            target.host,
            target.address,
            worker_count(target.concurrency, total),
            target.timeout
        );

        let stop_monitor = CancellationToken::new();
        let monitor = ProgressMonitor::new(counter.clone(), total)
            .with_interval(self.poll_interval)
            .spawn(make_reporter(total), stop_monitor.clone());

        let stats = WorkerPool::new(
            source,
            self.dialer.clone(),
            sink.clone(),
            target.address,
            target.timeout,
        )
        .with_host(&target.host)
        .with_progress(counter.clone())
        .with_cancel(self.cancel.clone())
        .run(target.concurrency)
        .await;

        stop_monitor.cancel();
        if let Err(e) = monitor.await {
            tracing::warn!("progress monitor failed: {e}");
        }

        enter(ScanPhase::Finalizing);
        let open = sink.snapshot_sorted().await;
        let cancelled = self.cancel.is_cancelled() && stats.dispatched < total;
        if cancelled {
            tracing::warn!(
                "Scan on {} cancelled after {}/{} ports",
                target.host,
                stats.dispatched,
                total
            );
        }

        enter(ScanPhase::Done);
        tracing::info!(
            "Scan completed on {}: {} open, {} errors",
            target.host,
            open.len(),
            stats.errors
        );
        Ok(ScanReport {
            host: target.host,
            address: target.address,
            start_port: target.range.start(),
            end_port: target.range.end(),
            open,
            scanned: stats.dispatched,
            total,
            errors: stats.errors,
            workers: stats.workers,
            cancelled,
            started_at,
            finished_at: now_rfc3339(),
        })
    }
}

fn enter(phase: ScanPhase) {
    tracing::debug!("scan phase: {phase:?}");
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
