//! sonar network - port scanning, banner grabbing, TLS inspection, host discovery
//!
//! This crate provides the scanning and fingerprinting engine:
//! - Port specification parsing and well-known port lists
//! - Service classification from port numbers
//! - Batch-bounded TCP connect scanning
//! - Protocol-aware banner grabbing and TLS certificate inspection
//! - Ping sweeps and local network detection
//!
//! The free functions below are the entry points a front end calls.

pub mod banner;
pub mod discovery;
pub mod ports;
pub mod probe;
pub mod resolve;
pub mod scheduler;
pub mod service;
pub mod tls;

pub use banner::{BannerGrabber, BannerOutcome, ProbePayload};
pub use discovery::{
    local_networks, ping_host, HostDiscovery, LivenessProbe, LocalNetwork, LocalSweep,
    PingProbe, SweepConfig,
};
pub use ports::{PortSet, TOP_100, TOP_20};
pub use probe::{is_port_open, ProbeOutcome, Prober, TcpConnectProbe};
pub use resolve::{resolve, resolve_host};
pub use scheduler::ScanScheduler;
pub use service::{protocol_tag, service_name};
pub use tls::TlsInspector;

use sonar_core::{PortOutcome, Result, ScanOptions, ScanResult};

/// Scan `host` over `port_spec` with real TCP connects
pub async fn scan(host: &str, port_spec: &str, options: &ScanOptions) -> Result<ScanResult> {
    ScanScheduler::new().scan(host, port_spec, options).await
}

/// Inspect one port with service detection and banner or TLS always on
pub async fn scan_single(host: &str, port: u16) -> Result<PortOutcome> {
    ScanScheduler::new().scan_single(host, port).await
}

/// Banner text or a bracketed marker; never fails
pub async fn grab_banner(host: &str, port: u16) -> String {
    BannerGrabber::new().grab(host, port).await
}

/// Ping sweep of `subnet_base/cidr`, capped at 50 addresses
pub async fn discover_hosts(subnet_base: &str, cidr: u8) -> Result<Vec<String>> {
    HostDiscovery::new().sweep(subnet_base, cidr).await
}
