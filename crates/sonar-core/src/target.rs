//! Scan target definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A single host to scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScanTarget {
    /// Literal IP address
    Ip(IpAddr),

    /// Hostname resolved through the OS resolver before scanning
    Hostname(String),
}

impl ScanTarget {
    /// Create a target from an IP address
    pub fn ip(addr: IpAddr) -> Self {
        ScanTarget::Ip(addr)
    }

    /// Parse a caller-supplied host argument.
    ///
    /// A leading `http://`/`https://` scheme and any trailing path are
    /// stripped, so a pasted URL scans its host. Empty input or input with
    /// embedded whitespace is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidTarget("empty host".to_string()));
        }

        let host = s
            .strip_prefix("https://")
            .or_else(|| s.strip_prefix("http://"))
            .unwrap_or(s);
        let host = host.split('/').next().unwrap_or(host);

        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(Error::InvalidTarget(format!("malformed host: {:?}", s)));
        }

        // Bracketed IPv6 literal
        let unbracketed = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(ScanTarget::Ip(ip));
        }

        if host.contains(':') || host.starts_with('-') {
            return Err(Error::InvalidTarget(format!("malformed host: {:?}", s)));
        }

        Ok(ScanTarget::Hostname(host.to_string()))
    }

    /// Host string used for SNI and display
    pub fn host(&self) -> String {
        match self {
            ScanTarget::Ip(ip) => ip.to_string(),
            ScanTarget::Hostname(host) => host.clone(),
        }
    }
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.host())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip() {
        let target = ScanTarget::parse("192.168.1.1").unwrap();
        assert!(matches!(target, ScanTarget::Ip(_)));
    }

    #[test]
    fn test_parse_ipv6() {
        let target = ScanTarget::parse("[::1]").unwrap();
        assert_eq!(target, ScanTarget::Ip("::1".parse().unwrap()));
    }

    #[test]
    fn test_parse_hostname() {
        let target = ScanTarget::parse("server.example.com").unwrap();
        assert_eq!(target, ScanTarget::Hostname("server.example.com".into()));
    }

    #[test]
    fn test_parse_url_strips_scheme_and_path() {
        let target = ScanTarget::parse("https://app.example.com/login").unwrap();
        assert_eq!(target, ScanTarget::Hostname("app.example.com".into()));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ScanTarget::parse("").is_err());
        assert!(ScanTarget::parse("   ").is_err());
        assert!(ScanTarget::parse("two words").is_err());
        assert!(ScanTarget::parse("host:80").is_err());
    }
}
