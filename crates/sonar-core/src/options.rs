//! Per-scan options passed explicitly into every scan call

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options recognised by a port scan.
///
/// Every field has a default; a partially specified document deserialises
/// with the missing fields filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanOptions {
    /// Per-probe deadline in milliseconds
    pub timeout_ms: u64,
    /// Maximum in-flight probes per batch
    pub concurrency: usize,
    /// Attach service name and protocol tag to open ports
    pub service_detection: bool,
    /// Grab a banner (or TLS descriptor) from open ports
    pub banner_grab: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            concurrency: 100,
            service_detection: true,
            banner_grab: false,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_service_detection(mut self, enabled: bool) -> Self {
        self.service_detection = enabled;
        self
    }

    pub fn with_banner_grab(mut self, enabled: bool) -> Self {
        self.banner_grab = enabled;
        self
    }

    /// Connect deadline for a single probe
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Banner reads get twice the connect budget
    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.saturating_mul(2))
    }

    /// Batch size actually used; zero is clamped to one
    pub fn batch_size(&self) -> usize {
        self.concurrency.max(1)
    }
}
