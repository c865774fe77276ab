//! Error types for the sonar engine
//!
//! Only entry-point argument problems and configuration loading surface as
//! `Error`. Per-port and per-host failures are folded into result data.

use thiserror::Error;

/// Result type alias using sonar Error
pub type Result<T> = std::result::Result<T, Error>;

/// sonar error types
#[derive(Error, Debug)]
pub enum Error {
    // === Target Errors ===
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("DNS resolution failed for: {hostname}")]
    DnsResolutionFailed { hostname: String },

    #[error("Invalid subnet: {0}")]
    InvalidSubnet(String),

    // === Scanning Errors ===
    #[error("Scan cancelled: {reason}")]
    ScanCancelled { reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Check if this error should stop a multi-host run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ScanCancelled { .. } | Error::Configuration(_))
    }

    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTarget(_) => "INVALID_TARGET",
            Error::DnsResolutionFailed { .. } => "DNS_FAILED",
            Error::InvalidSubnet(_) => "INVALID_SUBNET",
            Error::ScanCancelled { .. } => "SCAN_CANCELLED",
            Error::Configuration(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidTarget("".into()).code(), "INVALID_TARGET");
        assert_eq!(
            Error::DnsResolutionFailed {
                hostname: "nope.invalid".into()
            }
            .code(),
            "DNS_FAILED"
        );
        assert_eq!(Error::InvalidSubnet("10.0.0".into()).code(), "INVALID_SUBNET");
        assert_eq!(Error::Configuration("bad".into()).code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(Error::ScanCancelled {
            reason: "ctrl-c".into()
        }
        .is_fatal());
        assert!(Error::Configuration("missing file".into()).is_fatal());
        assert!(!Error::InvalidTarget("x y".into()).is_fatal());
        assert!(!Error::InvalidSubnet("10.0.0.0/40".into()).is_fatal());
        assert!(!Error::DnsResolutionFailed {
            hostname: "nope.invalid".into()
        }
        .is_fatal());
    }
}
