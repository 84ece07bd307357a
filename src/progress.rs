//! Progress observation for a running scan.
//!
//! Workers bump a [`ProgressCounter`] after every attempt. A [`ProgressMonitor`]
//! polls that counter on its own task and forwards snapshots to a
//! [`ProgressReporter`]; it never touches the result sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::types::ProgressState;

/// Default poll interval of the monitor.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Monotonic count of finished port attempts, shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    completed: Arc<AtomicU64>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

/// Receives periodic progress snapshots.
pub trait ProgressReporter: Send + Sync + 'static {
    fn report(&self, state: ProgressState);

    /// Called once with the last snapshot when monitoring stops.
    fn finish(&self, state: ProgressState) {
        self.report(state);
    }
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _state: ProgressState) {}
}

/// Terminal progress bar.
#[derive(Clone)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("Scanning ports [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, state: ProgressState) {
        self.bar.set_length(state.total);
        self.bar.set_position(state.completed);
    }

    fn finish(&self, state: ProgressState) {
        self.report(state);
        self.bar.finish();
    }
}

/// Polls a [`ProgressCounter`] until the scan completes or is stopped.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    counter: ProgressCounter,
    total: u64,
    interval: Duration,
}

impl ProgressMonitor {
    pub fn new(counter: ProgressCounter, total: u64) -> Self {
        Self {
            counter,
            total,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            completed: self.counter.completed().min(self.total),
            total: self.total,
        }
    }

    /// Run the poll loop on its own task.
    ///
    /// The loop ends when every port is accounted for or `stop` fires, and
    /// returns the last snapshot it reported.
    pub fn spawn<R: ProgressReporter>(self, reporter: R, stop: CancellationToken) -> JoinHandle<ProgressState> {
        tokio::spawn(async move {
            loop {
                let state = self.snapshot();
                if state.is_complete() || stop.is_cancelled() {
                    break;
                }
                reporter.report(state);
                tokio::select! {
                    _ = time::sleep(self.interval) => {}
                    _ = stop.cancelled() => {}
                }
            }
            let last = self.snapshot();
            reporter.finish(last);
            last
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<ProgressState>>>);

    impl ProgressReporter for Recording {
        fn report(&self, state: ProgressState) {
            self.0.lock().unwrap().push(state);
        }
    }

    #[tokio::test]
    async fn monitor_stops_when_complete() {
        let counter = ProgressCounter::new();
        let rec = Recording::default();
        let handle = ProgressMonitor::new(counter.clone(), 3)
            .with_interval(Duration::from_millis(5))
            .spawn(rec.clone(), CancellationToken::new());

        for _ in 0..3 {
            time::sleep(Duration::from_millis(10)).await;
            counter.increment();
        }
        let last = handle.await.unwrap();
        assert_eq!(last, ProgressState { completed: 3, total: 3 });

        let seen = rec.0.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0].completed <= w[1].completed));
        assert!(seen.iter().all(|s| s.completed <= s.total));
        assert_eq!(seen.last().copied(), Some(last));
    }

    #[tokio::test]
    async fn monitor_stops_on_signal() {
        let counter = ProgressCounter::new();
        let stop = CancellationToken::new();
        let handle = ProgressMonitor::new(counter.clone(), 100)
            .with_interval(Duration::from_secs(60))
            .spawn(NoProgress, stop.clone());
        counter.increment();
        stop.cancel();
        let last = handle.await.unwrap();
        assert_eq!(last.completed, 1);
        assert!(!last.is_complete());
    }

    #[test]
    fn snapshot_never_exceeds_total() {
        let counter = ProgressCounter::new();
        for _ in 0..5 {
            counter.increment();
        }
        let m = ProgressMonitor::new(counter, 3);
        assert_eq!(m.snapshot(), ProgressState { completed: 3, total: 3 });
    }
}
