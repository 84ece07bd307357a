use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dialer::Dialer;
use crate::ports::PortSource;
use crate::progress::ProgressCounter;
use crate::sink::ResultSink;
use crate::types::PortOutcome;

/// Never spawn more workers than there are ports to scan.
pub fn worker_count(requested: usize, total_ports: u64) -> usize {
    let total = usize::try_from(total_ports).unwrap_or(usize::MAX);
    requested.min(total)
}

/// Counters gathered from every worker once the pool has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub dispatched: u64,
    pub errors: u64,
}

#[derive(Debug, Default)]
struct WorkerStats {
    dispatched: u64,
    errors: u64,
}

/// Everything a worker needs, shared by all of them.
struct WorkerContext<D> {
    source: Arc<PortSource>,
    dialer: Arc<D>,
    sink: Arc<ResultSink>,
    progress: ProgressCounter,
    cancel: CancellationToken,
    host: Arc<str>,
    addr: IpAddr,
    timeout: Duration,
}

impl<D> Clone for WorkerContext<D> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            dialer: self.dialer.clone(),
            sink: self.sink.clone(),
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
            host: self.host.clone(),
            addr: self.addr,
            timeout: self.timeout,
        }
    }
}

/// Fixed set of workers draining a [`PortSource`].
pub struct WorkerPool<D> {
    ctx: WorkerContext<D>,
}

impl<D: Dialer + 'static> WorkerPool<D> {
    pub fn new(
        source: Arc<PortSource>,
        dialer: Arc<D>,
        sink: Arc<ResultSink>,
        addr: IpAddr,
        timeout: Duration,
    ) -> Self {
        Self {
            ctx: WorkerContext {
                source,
                dialer,
                sink,
                progress: ProgressCounter::new(),
                cancel: CancellationToken::new(),
                host: Arc::from(addr.to_string()),
                addr,
                timeout,
            },
        }
    }

    /// Name of the target as given by the caller, used in log lines.
    pub fn with_host(mut self, host: &str) -> Self {
        self.ctx.host = Arc::from(host);
        self
    }

    /// Counter bumped after every finished attempt, whatever its outcome.
    pub fn with_progress(mut self, progress: ProgressCounter) -> Self {
        self.ctx.progress = progress;
        self
    }

    /// Workers stop pulling new ports once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.ctx.cancel = cancel;
        self
    }

    /// Launch up to `requested` workers and wait until every one has exited.
    ///
    /// A worker exits when the source reports exhaustion (or on cancellation),
    /// so returning from here means every dispatched port has been attempted.
    pub async fn run(self, requested: usize) -> PoolStats {
        let workers = worker_count(requested.max(1), self.ctx.source.total());
        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(run_worker(id, self.ctx.clone()));
        }

        let mut stats = PoolStats {
            workers,
            ..PoolStats::default()
        };
        while let Some(res) = set.join_next().await {
            match res {
                Ok(w) => {
                    stats.dispatched += w.dispatched;
                    stats.errors += w.errors;
                }
                Err(e) => tracing::error!("scan worker terminated abnormally: {e}"),
            }
        }
        stats
    }
}

async fn run_worker<D: Dialer>(id: usize, ctx: WorkerContext<D>) -> WorkerStats {
    let mut stats = WorkerStats::default();
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Some(port) = ctx.source.next_port() else {
            break;
        };
        tracing::debug!("Scanning port {port}...");

        match ctx.dialer.attempt(ctx.addr, port, ctx.timeout).await {
            PortOutcome::Open(service) => {
                tracing::info!("Port {port} ({service}) open on {}", ctx.host);
                ctx.sink.record(port, service).await;
            }
            PortOutcome::Closed => {}
            PortOutcome::Error(reason) => {
                tracing::warn!("worker {id}: port {port} not scanned cleanly: {reason}");
                stats.errors += 1;
            }
        }
        stats.dispatched += 1;
        ctx.progress.increment();
    }
    tracing::trace!("worker {id} exiting after {} ports", stats.dispatched);
    stats
}
