use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::LookupError;

/// Location of the system services database on Unix-like hosts.
pub const SYSTEM_SERVICES_PATH: &str = "/etc/services";

/// Fallback name when a port has no registered service.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Maps a TCP port to a human-readable service name.
pub trait ServiceLookup: Send + Sync {
    fn service_name(&self, port: u16) -> Result<String, LookupError>;
}

/// Resolve a service name, collapsing any lookup failure to `"unknown"`.
pub fn service_or_unknown<S: ServiceLookup + ?Sized>(lookup: &S, port: u16) -> String {
    lookup
        .service_name(port)
        .unwrap_or_else(|_| UNKNOWN_SERVICE.to_string())
}

/// In-memory port → service table for TCP.
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    names: HashMap<u16, String>,
}

impl ServiceTable {
    /// Load the system database, falling back to the built-in table if it cannot be read.
    pub fn system() -> Self {
        match Self::from_path(SYSTEM_SERVICES_PATH) {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => Self::builtin(),
            Err(e) => {
                tracing::debug!("using built-in service table: {e}");
                Self::builtin()
            }
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            LookupError::Unavailable(format!("{}: {e}", path.as_ref().display()))
        })?;
        Ok(Self::parse_services_str(&content))
    }

    /// Parse `/etc/services` syntax, keeping only tcp entries.
    ///
    /// Each line is `name port/proto [aliases...] [# comment]`. The first entry
    /// for a port wins, matching how the C library resolves duplicates.
    pub fn parse_services_str(s: &str) -> Self {
        let mut names = HashMap::new();
        for raw_line in s.lines() {
            let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, proto)) = port_proto.split_once('/') else {
                continue;
            };
            if !proto.eq_ignore_ascii_case("tcp") {
                continue;
            }
            if let Ok(port) = port.parse::<u16>() {
                names.entry(port).or_insert_with(|| name.to_string());
            }
        }
        Self { names }
    }

    /// A conservative table of commonly used TCP ports.
    pub fn builtin() -> Self {
        const BUILTIN: &[(u16, &str)] = &[
            (21, "ftp"),
            (22, "ssh"),
            (23, "telnet"),
            (25, "smtp"),
            (53, "domain"),
            (80, "http"),
            (110, "pop3"),
            (111, "sunrpc"),
            (135, "epmap"),
            (139, "netbios-ssn"),
            (143, "imap2"),
            (389, "ldap"),
            (443, "https"),
            (445, "microsoft-ds"),
            (465, "submissions"),
            (587, "submission"),
            (631, "ipp"),
            (993, "imaps"),
            (995, "pop3s"),
            (1433, "ms-sql-s"),
            (1521, "ncube-lm"),
            (1883, "mqtt"),
            (2049, "nfs"),
            (3306, "mysql"),
            (3389, "ms-wbt-server"),
            (5432, "postgresql"),
            (5672, "amqp"),
            (5900, "rfb"),
            (6379, "redis"),
            (8080, "http-alt"),
            (9092, "XmlIpcRegSvc"),
            (11211, "memcache"),
            (27017, "mongodb"),
        ];
        Self {
            names: BUILTIN
                .iter()
                .map(|&(p, n)| (p, n.to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ServiceLookup for ServiceTable {
    fn service_name(&self, port: u16) -> Result<String, LookupError> {
        self.names
            .get(&port)
            .cloned()
            .ok_or(LookupError::NotFound(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tcp_entries_only() {
        let input = r#"
            # Network services, Internet style
            ssh             22/tcp                          # SSH Remote Login Protocol
            domain          53/tcp
            domain          53/udp
            snmp            161/udp
            http            80/tcp          www             # WorldWideWeb HTTP
            www-alt         80/tcp
            broken-line
            bogus           notaport/tcp
        "#;
        let t = ServiceTable::parse_services_str(input);
        assert_eq!(t.len(), 3);
        assert_eq!(t.service_name(22).unwrap(), "ssh");
        assert_eq!(t.service_name(80).unwrap(), "http");
        assert_eq!(t.service_name(161), Err(LookupError::NotFound(161)));
    }

    #[test]
    fn missing_database_is_unavailable() {
        let err = ServiceTable::from_path("/nonexistent/services").unwrap_err();
        assert!(matches!(err, LookupError::Unavailable(_)));
    }

    #[test]
    fn unknown_fallback() {
        let t = ServiceTable::builtin();
        assert_eq!(service_or_unknown(&t, 443), "https");
        assert_eq!(service_or_unknown(&t, 1), UNKNOWN_SERVICE);
    }

    #[test]
    fn system_table_is_never_empty() {
        assert!(!ServiceTable::system().is_empty());
    }
}
