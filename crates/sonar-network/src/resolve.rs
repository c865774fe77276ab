//! Turning a validated target into an address via the OS resolver

use sonar_core::{Error, Result, ScanTarget};
use std::net::{IpAddr, SocketAddr};
use tokio::net::lookup_host;
use tracing::debug;

/// Resolve a target once, preferring an IPv4 address
pub async fn resolve(target: &ScanTarget) -> Result<IpAddr> {
    let hostname = match target {
        ScanTarget::Ip(ip) => return Ok(*ip),
        ScanTarget::Hostname(name) => name,
    };

    let failed = || Error::DnsResolutionFailed {
        hostname: hostname.clone(),
    };

    let addrs: Vec<SocketAddr> = lookup_host((hostname.as_str(), 0))
        .await
        .map_err(|e| {
            debug!("Resolving {} failed: {}", hostname, e);
            failed()
        })?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .map(|addr| addr.ip())
        .ok_or_else(failed)
}

/// Parse and resolve a raw host argument
pub async fn resolve_host(host: &str) -> Result<(ScanTarget, IpAddr)> {
    let target = ScanTarget::parse(host)?;
    let ip = resolve(&target).await?;
    Ok((target, ip))
}
