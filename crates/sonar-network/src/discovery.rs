//! Host discovery - ping sweeps of a bounded address range
//!
//! A sweep keeps the first three octets of the base address and tries host
//! suffixes `.1` through `.50`, whatever the prefix length. Liveness comes from the OS `ping` utility: a host counts as
//! up when the output carries a TTL marker.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pnet::datalink;
use pnet::ipnetwork::IpNetwork;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sonar_core::{Error, Result};
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Hard cap on liveness probes per sweep
pub const MAX_SWEEP_HOSTS: usize = 50;

/// Budget for one `ping` process, spawn to exit
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Decides whether a host answers
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self, host: &str) -> bool;
}

/// Single echo request through the OS `ping` binary
#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProbe {
    pub fn new() -> Self {
        Self {
            timeout: PING_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LivenessProbe for PingProbe {
    async fn is_alive(&self, host: &str) -> bool {
        let child = Command::new("ping")
            .args(ping_args())
            .arg(host)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match timeout(self.timeout, child).await {
            Ok(Ok(output)) => {
                let alive = has_ttl_marker(&String::from_utf8_lossy(&output.stdout));
                trace!("ping {}: alive={}", host, alive);
                alive
            }
            Ok(Err(e)) => {
                warn!("Could not run ping for {}: {}", host, e);
                false
            }
            Err(_) => {
                trace!("ping {} timed out", host);
                false
            }
        }
    }
}

/// One request, one second wait
fn ping_args() -> &'static [&'static str] {
    if cfg!(windows) {
        &["-n", "1", "-w", "1000"]
    } else if cfg!(target_os = "macos") {
        &["-c", "1", "-W", "1000"]
    } else {
        &["-c", "1", "-W", "1"]
    }
}

fn ttl_pattern() -> &'static Regex {
    static TTL: OnceLock<Regex> = OnceLock::new();
    TTL.get_or_init(|| Regex::new(r"(?i)\bttl=\d+").expect("valid TTL regex"))
}

/// Whether `ping` output reports a reply
pub fn has_ttl_marker(output: &str) -> bool {
    ttl_pattern().is_match(output)
}

/// Ping a single host once
pub async fn ping_host(host: &str) -> bool {
    PingProbe::new().is_alive(host).await
}

/// Sweep bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Addresses probed per sweep; clamped to [`MAX_SWEEP_HOSTS`]
    pub host_limit: usize,
    /// Pings in flight at once
    pub concurrency: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            host_limit: MAX_SWEEP_HOSTS,
            concurrency: 16,
        }
    }
}

/// A local IPv4 interface address and the network it sits on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNetwork {
    pub interface: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub prefix: u8,
    pub cidr: String,
    pub mac: Option<String>,
}

/// Hosts found on one local network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSweep {
    pub network: LocalNetwork,
    pub hosts: Vec<String>,
}

/// Non-loopback IPv4 addresses of every local interface
pub fn local_networks() -> Vec<LocalNetwork> {
    datalink::interfaces()
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .flat_map(|iface| {
            let mac = iface.mac.map(|mac| mac.to_string());
            let name = iface.name.clone();
            iface.ips.into_iter().filter_map(move |network| match network {
                IpNetwork::V4(v4) => {
                    let subnet = derive_subnet(v4.ip(), v4.mask());
                    Some(LocalNetwork {
                        interface: name.clone(),
                        ip: v4.ip(),
                        netmask: v4.mask(),
                        subnet,
                        prefix: v4.prefix(),
                        cidr: to_cidr(subnet, v4.prefix()),
                        mac: mac.clone(),
                    })
                }
                IpNetwork::V6(_) => None,
            })
        })
        .collect()
}

/// Network address of `ip` under `netmask`
pub fn derive_subnet(ip: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) & u32::from(netmask))
}

pub fn netmask_to_prefix(netmask: Ipv4Addr) -> u8 {
    u32::from(netmask).count_ones() as u8
}

pub fn to_cidr(subnet: Ipv4Addr, prefix: u8) -> String {
    format!("{}/{}", subnet, prefix)
}

/// Addresses a sweep of `base/prefix` will probe, ascending.
///
/// The first three octets of `base` are kept and the last one runs from 1 up
/// to `limit` (itself capped at [`MAX_SWEEP_HOSTS`]). The prefix is only
/// validated; it does not narrow or widen the range.
pub fn candidate_hosts(base: Ipv4Addr, prefix: u8, limit: usize) -> Result<Vec<Ipv4Addr>> {
    if prefix > 32 {
        return Err(Error::InvalidSubnet(format!(
            "prefix length {} is larger than 32",
            prefix
        )));
    }

    let [a, b, c, _] = base.octets();
    let count = limit.min(MAX_SWEEP_HOSTS) as u8;

    Ok((1..=count).map(|d| Ipv4Addr::new(a, b, c, d)).collect())
}

/// Ping sweep engine
pub struct HostDiscovery<L = PingProbe> {
    probe: L,
    config: SweepConfig,
}

impl HostDiscovery {
    pub fn new() -> Self {
        Self::with_probe(PingProbe::new())
    }
}

impl Default for HostDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LivenessProbe> HostDiscovery<L> {
    pub fn with_probe(probe: L) -> Self {
        Self {
            probe,
            config: SweepConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    pub fn probe(&self) -> &L {
        &self.probe
    }

    /// Ping the first addresses of `subnet_base/prefix`; responders come back in address order
    pub async fn sweep(&self, subnet_base: &str, prefix: u8) -> Result<Vec<String>> {
        let base: Ipv4Addr = subnet_base.trim().parse().map_err(|_| {
            Error::InvalidSubnet(format!("invalid subnet base: {}", subnet_base))
        })?;
        let candidates = candidate_hosts(base, prefix, self.config.host_limit)?;

        info!(
            "Sweeping {} ({} candidates)",
            to_cidr(base, prefix),
            candidates.len()
        );

        let hosts: Vec<String> = stream::iter(candidates)
            .map(|ip| async move {
                let host = ip.to_string();
                let alive = self.probe.is_alive(&host).await;
                if alive {
                    debug!("{} is up", host);
                }
                alive.then_some(host)
            })
            .buffered(self.config.concurrency.max(1))
            .filter_map(|host| async move { host })
            .collect()
            .await;

        info!("Sweep of {} found {} hosts", subnet_base, hosts.len());
        Ok(hosts)
    }

    /// Sweep every auto-detected local network
    pub async fn discover_local(&self) -> Result<Vec<LocalSweep>> {
        let networks = local_networks();
        if networks.is_empty() {
            warn!("No local IPv4 networks detected");
        }

        let mut sweeps = Vec::with_capacity(networks.len());
        for network in networks {
            let hosts = self
                .sweep(&network.subnet.to_string(), network.prefix)
                .await?;
            sweeps.push(LocalSweep { network, hosts });
        }
        Ok(sweeps)
    }
}
