use tokio::sync::Mutex;

use crate::types::{OpenPort, ScanResult};

/// Collects open ports reported by concurrent workers.
///
/// Writes are serialized by an internal lock; the sorted snapshot is taken
/// once all workers have finished.
#[derive(Debug, Default)]
pub struct ResultSink {
    entries: Mutex<Vec<OpenPort>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, port: u16, service: impl Into<String>) {
        let entry = OpenPort::new(port, service);
        let mut guard = self.entries.lock().await;
        guard.push(entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Copy of every recorded entry, ascending by port.
    pub async fn snapshot_sorted(&self) -> ScanResult {
        let mut out = self.entries.lock().await.clone();
        out.sort_by_key(|e| e.port);
        out
    }
}
