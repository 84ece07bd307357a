use std::future::Future;
use std::net::IpAddr;

use tokio::net::lookup_host;

use crate::error::ValidationError;

/// Turns a target host into the address every connection attempt will use.
pub trait HostResolver: Send + Sync {
    fn resolve(&self, host: &str) -> impl Future<Output = Result<IpAddr, ValidationError>> + Send;
}

/// Resolver backed by the operating system's name lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ValidationError> {
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidHost(host.to_string()));
        }
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Ok(ip);
        }

        let addrs: Vec<IpAddr> = match lookup_host((trimmed, 0)).await {
            Ok(it) => it.map(|sa| sa.ip()).collect(),
            Err(e) => {
                tracing::debug!("lookup of {trimmed} failed: {e}");
                return Err(ValidationError::InvalidHost(host.to_string()));
            }
        };
        pick_address(&addrs).ok_or_else(|| ValidationError::InvalidHost(host.to_string()))
    }
}

/// Prefer IPv4 when a name resolves to both families.
fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[tokio::test]
    async fn literal_addresses_resolve_without_lookup() {
        let ip = SystemResolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let ip = SystemResolver.resolve("::1").await.unwrap();
        assert_eq!(ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn empty_and_bogus_hosts_are_rejected() {
        assert!(SystemResolver.resolve("  ").await.is_err());
        assert!(matches!(
            SystemResolver.resolve("no-such-host.invalid").await,
            Err(ValidationError::InvalidHost(_))
        ));
    }

    #[test]
    fn ipv4_is_preferred() {
        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let v4 = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert_eq!(pick_address(&[v6, v4]), Some(v4));
        assert_eq!(pick_address(&[v6]), Some(v6));
        assert_eq!(pick_address(&[]), None);
    }
}
