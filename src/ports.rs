use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Inclusive TCP port range, `1 <= start <= end <= 65535`.
///
/// Deserialization goes through [`PortRange::new`], so a decoded range holds
/// the same invariant as a constructed one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "RawPortRange")]
pub struct PortRange {
    start: u16,
    end: u16,
}

#[derive(Deserialize)]
struct RawPortRange {
    start: u32,
    end: u32,
}

impl TryFrom<RawPortRange> for PortRange {
    type Error = ValidationError;

    fn try_from(raw: RawPortRange) -> Result<Self, Self::Error> {
        PortRange::new(raw.start, raw.end)
    }
}

impl PortRange {
    /// Validate raw bounds into a range.
    pub fn new(start: u32, end: u32) -> Result<Self, ValidationError> {
        let start = check_port(start)?;
        let end = check_port(end)?;
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Validate textual bounds, e.g. straight from the command line.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_port_str(start)?;
        let end = parse_port_str(end)?;
        Self::new(u32::from(start), u32::from(end))
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports in the range, never zero.
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Accept a raw port value only if it lies in 1..=65535.
pub fn check_port(val: u32) -> Result<u16, ValidationError> {
    if val == 0 || val > u32::from(u16::MAX) {
        return Err(ValidationError::PortOutOfRange(val));
    }
    Ok(val as u16)
}

/// Parse a textual port value such as `"8080"`.
pub fn parse_port_str(s: &str) -> Result<u16, ValidationError> {
    let val: u32 = s
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidPort(s.to_string()))?;
    check_port(val)
}

/// Hands out every port of a range exactly once to concurrent callers.
///
/// Dispatch is a single atomic increment on a cursor, so callers never block.
/// Once the cursor passes the end of the range every call returns `None`.
#[derive(Debug)]
pub struct PortSource {
    cursor: AtomicU32,
    end: u32,
    total: u64,
}

impl PortSource {
    pub fn new(range: PortRange) -> Self {
        Self {
            cursor: AtomicU32::new(u32::from(range.start)),
            end: u32::from(range.end),
            total: range.len() as u64,
        }
    }

    /// Next undispatched port, or `None` once the range is exhausted.
    pub fn next_port(&self) -> Option<u16> {
        // Overshoot past `end` is bounded by the number of concurrent callers.
        if self.cursor.load(Ordering::Relaxed) > self.end {
            return None;
        }
        let port = self.cursor.fetch_add(1, Ordering::Relaxed);
        if port > self.end {
            return None;
        }
        Some(port as u16)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn range_bounds_are_validated() {
        assert!(PortRange::new(1, 65535).is_ok());
        assert_eq!(
            PortRange::new(0, 10),
            Err(ValidationError::PortOutOfRange(0))
        );
        assert_eq!(
            PortRange::new(10, 70000),
            Err(ValidationError::PortOutOfRange(70000))
        );
        assert_eq!(
            PortRange::new(5000, 10),
            Err(ValidationError::InvertedRange { start: 5000, end: 10 })
        );
    }

    #[test]
    fn single_port_range() {
        let r = PortRange::new(443, 443).unwrap();
        assert_eq!(r.len(), 1);
        assert!(r.contains(443));
        assert_eq!(r.to_string(), "443-443");
    }

    #[test]
    fn parse_textual_bounds() {
        let r = PortRange::parse("20", " 25").unwrap();
        assert_eq!((r.start(), r.end()), (20, 25));
        assert!(matches!(
            PortRange::parse("1", "http"),
            Err(ValidationError::InvalidPort(_))
        ));
        assert_eq!(
            PortRange::parse("5000", "10"),
            Err(ValidationError::InvertedRange { start: 5000, end: 10 })
        );
        assert_eq!(
            PortRange::parse("0", "10"),
            Err(ValidationError::PortOutOfRange(0))
        );
    }

    #[test]
    fn decoding_enforces_bounds() {
        let ok: PortRange = serde_json::from_str(r#"{"start":22,"end":80}"#).unwrap();
        assert_eq!(ok, PortRange::new(22, 80).unwrap());
        assert!(serde_json::from_str::<PortRange>(r#"{"start":5000,"end":10}"#).is_err());
        assert!(serde_json::from_str::<PortRange>(r#"{"start":0,"end":0}"#).is_err());
        assert!(serde_json::from_str::<PortRange>(r#"{"start":1,"end":70000}"#).is_err());
    }

    #[test]
    fn parse_port_values() {
        assert_eq!(parse_port_str(" 22 ").unwrap(), 22);
        assert!(matches!(
            parse_port_str("ssh"),
            Err(ValidationError::InvalidPort(_))
        ));
        assert!(parse_port_str("65536").is_err());
    }

    #[test]
    fn source_exhausts_and_stays_exhausted() {
        let src = PortSource::new(PortRange::new(10, 12).unwrap());
        assert_eq!(src.total(), 3);
        assert_eq!(src.next_port(), Some(10));
        assert_eq!(src.next_port(), Some(11));
        assert_eq!(src.next_port(), Some(12));
        for _ in 0..5 {
            assert_eq!(src.next_port(), None);
        }
    }

    #[test]
    fn source_top_of_range_does_not_wrap() {
        let src = PortSource::new(PortRange::new(65534, 65535).unwrap());
        assert_eq!(src.next_port(), Some(65534));
        assert_eq!(src.next_port(), Some(65535));
        assert_eq!(src.next_port(), None);
    }

    #[test]
    fn concurrent_callers_get_each_port_once() {
        let src = Arc::new(PortSource::new(PortRange::new(1, 20_000).unwrap()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let src = src.clone();
                std::thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Some(p) = src.next_port() {
                        got.push(p);
                    }
                    got
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut count = 0usize;
        for h in handles {
            for p in h.join().unwrap() {
                assert!(seen.insert(p), "port {p} dispatched twice");
                count += 1;
            }
        }
        assert_eq!(count, 20_000);
        assert!((1..=20_000u16).all(|p| seen.contains(&p)));
    }
}
