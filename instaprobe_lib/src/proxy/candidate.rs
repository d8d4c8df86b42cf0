//! Proxy addresses, per-address performance statistics and scoring.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheme a proxy speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
    Socks5,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "HTTP"),
            Protocol::Https => write!(f, "HTTPS"),
            Protocol::Socks5 => write!(f, "SOCKS5"),
        }
    }
}

/// `host` or `host:port`. Client IPs registered as rotation candidates carry no port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProxyAddr {
    pub host: String,
    pub port: Option<u16>,
}

impl ProxyAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
        }
    }

    pub fn host_only(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
        }
    }
}

impl fmt::Display for ProxyAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

impl FromStr for ProxyAddr {
    type Err = String;

    /// Parses `host:port`. The port is required and must be non-zero; scheme
    /// prefixes such as `http://` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("missing port in '{}'", s))?;
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(format!("invalid host in '{}'", s));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| format!("invalid port in '{}'", s))?;
        if port == 0 {
            return Err(format!("port 0 in '{}'", s));
        }
        Ok(Self::new(host, port))
    }
}

/// Outcome counters for one route. The score is derived from these on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub success_count: u64,
    pub failure_count: u64,
    pub last_latency: Option<Duration>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl PerformanceStats {
    pub fn record(&mut self, success: bool, latency: Duration) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.last_latency = Some(latency);
        self.last_used_at = Some(Utc::now());
    }

    /// `successes / (successes + failures + 1)`; the `+1` keeps untested routes below proven ones.
    pub fn success_rate(&self) -> f64 {
        self.success_count as f64 / (self.success_count + self.failure_count + 1) as f64
    }

    pub fn is_tested(&self) -> bool {
        self.success_count + self.failure_count > 0
    }

    /// `success_rate - min(latency, ceiling) / ceiling`. Never-measured latency costs nothing.
    pub fn score(&self, latency_ceiling: Duration) -> f64 {
        let ceiling = latency_ceiling.as_secs_f64();
        let penalty = match self.last_latency {
            Some(latency) if ceiling > 0.0 => latency.as_secs_f64().min(ceiling) / ceiling,
            _ => 0.0,
        };
        self.success_rate() - penalty
    }
}

/// A route an outbound request may take.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyCandidate {
    pub address: ProxyAddr,
    pub protocol: Protocol,
    pub stats: PerformanceStats,
    pub is_user_ip: bool,
    /// Insertion order; higher is newer.
    pub added_seq: u64,
    pub added_at: DateTime<Utc>,
}

impl ProxyCandidate {
    pub fn new(address: ProxyAddr, protocol: Protocol, added_seq: u64) -> Self {
        Self {
            address,
            protocol,
            stats: PerformanceStats::default(),
            is_user_ip: false,
            added_seq,
            added_at: Utc::now(),
        }
    }

    /// Pool key; unique within the pool.
    pub fn key(&self) -> String {
        self.address.to_string()
    }

    /// URL handed to the HTTP client, e.g. `socks5://10.0.0.1:1080`.
    pub fn proxy_url(&self) -> String {
        format!("{}://{}", self.protocol.scheme(), self.address)
    }

    pub fn score(&self, latency_ceiling: Duration) -> f64 {
        self.stats.score(latency_ceiling)
    }
}

impl fmt::Display for ProxyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} ok / {} failed)",
            self.address, self.protocol, self.stats.success_count, self.stats.failure_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CEILING: Duration = Duration::from_secs(10);

    fn stats(success: u64, failure: u64, latency_ms: u64) -> PerformanceStats {
        PerformanceStats {
            success_count: success,
            failure_count: failure,
            last_latency: Some(Duration::from_millis(latency_ms)),
            last_used_at: None,
        }
    }

    #[test]
    fn reliable_beats_flaky_at_same_latency() {
        let reliable = stats(10, 0, 200);
        let flaky = stats(10, 10, 200);
        assert!(reliable.score(CEILING) > flaky.score(CEILING));
    }

    #[test]
    fn faster_beats_slower_at_same_record() {
        assert!(stats(5, 0, 100).score(CEILING) > stats(5, 0, 3000).score(CEILING));
    }

    #[test]
    fn latency_penalty_saturates_at_ceiling() {
        let at_ceiling = stats(0, 1, 10_000).score(CEILING);
        let beyond = stats(0, 1, 60_000).score(CEILING);
        assert_eq!(at_ceiling, beyond);
        assert_eq!(beyond, -1.0);
    }

    #[test]
    fn untested_scores_zero() {
        let fresh = PerformanceStats::default();
        assert_eq!(fresh.score(CEILING), 0.0);
        assert!(!fresh.is_tested());
    }

    #[test]
    fn record_updates_counters_and_latency() {
        let mut s = PerformanceStats::default();
        s.record(true, Duration::from_millis(300));
        s.record(false, Duration::from_secs(10));
        assert_eq!(s.success_count, 1);
        assert_eq!(s.failure_count, 1);
        assert_eq!(s.last_latency, Some(Duration::from_secs(10)));
        assert!(s.last_used_at.is_some());
    }

    #[test]
    fn parse_proxy_addr() {
        let addr: ProxyAddr = "10.1.2.3:8080".parse().unwrap();
        assert_eq!(addr.host, "10.1.2.3");
        assert_eq!(addr.port, Some(8080));
        assert_eq!(addr.to_string(), "10.1.2.3:8080");

        assert!("10.1.2.3".parse::<ProxyAddr>().is_err());
        assert!("10.1.2.3:notaport".parse::<ProxyAddr>().is_err());
        assert!("10.1.2.3:0".parse::<ProxyAddr>().is_err());
        assert!(":8080".parse::<ProxyAddr>().is_err());
    }

    #[test]
    fn scheme_prefixed_addr_is_rejected() {
        assert!("http://1.2.3.4:80".parse::<ProxyAddr>().is_err());
        assert!("socks5://1.2.3.4:1080".parse::<ProxyAddr>().is_err());
        assert!("1.2.3.4/x:80".parse::<ProxyAddr>().is_err());
    }

    #[test]
    fn proxy_url_uses_scheme() {
        let candidate =
            ProxyCandidate::new(ProxyAddr::new("10.0.0.1", 1080), Protocol::Socks5, 1);
        assert_eq!(candidate.proxy_url(), "socks5://10.0.0.1:1080");
        assert_eq!(candidate.key(), "10.0.0.1:1080");
    }

    #[test]
    fn host_only_display() {
        assert_eq!(ProxyAddr::host_only("1.2.3.4").to_string(), "1.2.3.4");
    }
}
