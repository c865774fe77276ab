//! Scan outcome value types handed back to the caller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// State of a probed port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
        }
    }
}

/// Coarse protocol tag derived from the port number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tls,
    Udp,
    Http,
    Ftp,
    Ssh,
    Smtp,
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tls => "tls",
            Protocol::Udp => "udp",
            Protocol::Http => "http",
            Protocol::Ftp => "ftp",
            Protocol::Ssh => "ssh",
            Protocol::Smtp => "smtp",
            Protocol::Tcp => "tcp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiated session parameters and peer certificate summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsDescriptor {
    /// e.g. "TLSv1.3"
    pub negotiated_protocol_version: String,
    /// IANA cipher suite name
    pub cipher_suite: String,
    /// Distinguished name of the certificate subject
    pub subject: String,
    /// Distinguished name of the certificate issuer
    pub issuer: String,
    pub valid_from: String,
    pub valid_to: String,
    /// Colon separated hex
    pub serial_number: String,
}

impl TlsDescriptor {
    /// One-line summary, used where a banner string is expected
    pub fn summary(&self) -> String {
        format!(
            "{} {} subject=[{}] issuer=[{}]",
            self.negotiated_protocol_version, self.cipher_suite, self.subject, self.issuer
        )
    }
}

/// Outcome for a single probed port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOutcome {
    pub port: u16,
    pub state: PortState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Banner text, or a bracketed marker describing why none was read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsDescriptor>,
}

impl PortOutcome {
    pub fn open(port: u16) -> Self {
        Self {
            port,
            state: PortState::Open,
            service: None,
            protocol: None,
            banner: None,
            tls: None,
        }
    }

    pub fn closed(port: u16) -> Self {
        Self {
            port,
            state: PortState::Closed,
            service: None,
            protocol: None,
            banner: None,
            tls: None,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>, protocol: Protocol) -> Self {
        self.service = Some(service.into());
        self.protocol = Some(protocol);
        self
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn with_tls(mut self, tls: Option<TlsDescriptor>) -> Self {
        self.tls = tls;
        self
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// Aggregated result of scanning one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub host: String,
    /// Ports actually probed, open or not
    pub total_ports_scanned: usize,
    pub open_ports_count: usize,
    /// Open ports only, ascending
    pub ports: Vec<PortOutcome>,
    pub elapsed_ms: f64,
    pub scan_time_formatted: String,
    pub timestamp: DateTime<Utc>,
    /// Set when a cancellation stopped the scan before every batch ran
    pub cancelled: bool,
}

impl ScanResult {
    /// Build a result; `ports` must already hold open ports in ascending order
    pub fn new(
        host: impl Into<String>,
        total_ports_scanned: usize,
        ports: Vec<PortOutcome>,
        elapsed: Duration,
        cancelled: bool,
    ) -> Self {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        Self {
            host: host.into(),
            total_ports_scanned,
            open_ports_count: ports.len(),
            ports,
            elapsed_ms,
            scan_time_formatted: format!("{:.2}s", elapsed.as_secs_f64()),
            timestamp: Utc::now(),
            cancelled,
        }
    }

    /// Open port numbers, ascending
    pub fn open_ports(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.port).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_counts() {
        let ports = vec![
            PortOutcome::open(22).with_service("SSH", Protocol::Ssh),
            PortOutcome::open(80),
        ];
        let result = ScanResult::new("127.0.0.1", 100, ports, Duration::from_millis(1234), false);

        assert_eq!(result.total_ports_scanned, 100);
        assert_eq!(result.open_ports_count, 2);
        assert_eq!(result.open_ports(), vec![22, 80]);
        assert_eq!(result.scan_time_formatted, "1.23s");
        assert!(result.elapsed_ms > 1233.0);
    }

    #[test]
    fn test_port_outcome_json_shape() {
        let outcome = PortOutcome::open(80)
            .with_service("HTTP", Protocol::Http)
            .with_banner("HTTP/1.0 200 OK");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["port"], 80);
        assert_eq!(json["state"], "open");
        assert_eq!(json["protocol"], "http");
        assert!(json.get("tls").is_none());

        let closed = serde_json::to_value(PortOutcome::closed(81)).unwrap();
        assert_eq!(closed["state"], "closed");
        assert!(closed.get("service").is_none());
    }

    #[test]
    fn test_scan_result_camel_case() {
        let result = ScanResult::new("h", 0, vec![], Duration::from_micros(10), false);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("totalPortsScanned").is_some());
        assert!(json.get("openPortsCount").is_some());
        assert!(json["elapsedMs"].as_f64().unwrap() > 0.0);
    }
}
