use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;

use crate::services::{service_or_unknown, ServiceLookup, ServiceTable};
use crate::types::PortOutcome;

/// Makes a single bounded connection attempt and classifies the result.
pub trait Dialer: Send + Sync {
    fn attempt(
        &self,
        addr: IpAddr,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = PortOutcome> + Send;
}

/// TCP connect-scan dialer. One attempt per call, no retries.
#[derive(Clone)]
pub struct TcpDialer<S = ServiceTable> {
    services: Arc<S>,
}

impl TcpDialer<ServiceTable> {
    /// Dialer naming open ports from the system services database.
    pub fn system() -> Self {
        Self::new(ServiceTable::system())
    }
}

impl<S: ServiceLookup> TcpDialer<S> {
    pub fn new(services: S) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

impl<S: ServiceLookup> Dialer for TcpDialer<S> {
    async fn attempt(&self, addr: IpAddr, port: u16, timeout: Duration) -> PortOutcome {
        let sock = SocketAddr::new(addr, port);
        match bounded_connect(TcpStream::connect(sock), timeout).await {
            Ok(stream) => {
                // Close before the lookup so no socket outlives the attempt.
                drop(stream);
                PortOutcome::Open(service_or_unknown(self.services.as_ref(), port))
            }
            Err(outcome) => outcome,
        }
    }
}

/// Drive a connect future under `timeout`.
///
/// Returns the connection, or the not-open outcome it failed with. An
/// elapsed timeout counts as `Closed`.
pub async fn bounded_connect<F, T>(connect: F, timeout: Duration) -> Result<T, PortOutcome>
where
    F: Future<Output = io::Result<T>>,
{
    match time::timeout(timeout, connect).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(classify_connect_error(&e)),
        Err(_elapsed) => Err(PortOutcome::Closed),
    }
}

/// Refusals and resets mean nothing is listening; anything else is unexpected.
pub fn classify_connect_error(e: &io::Error) -> PortOutcome {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::TimedOut => PortOutcome::Closed,
        _ => PortOutcome::Error(e.to_string()),
    }
}
