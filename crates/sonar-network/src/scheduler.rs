//! Scan scheduling - batch-barrier port scanning of one host
//!
//! Ports are probed in consecutive batches of `concurrency`. A batch settles
//! completely before the next one starts, so at most `concurrency` probes are
//! ever outstanding. A single port can never abort a scan; only an invalid or
//! unresolvable host fails the whole call.

use crate::banner::BannerGrabber;
use crate::ports::PortSet;
use crate::probe::{Prober, TcpConnectProbe};
use crate::resolve::resolve_host;
use crate::service::{is_tls_port, protocol_tag, service_name};
use crate::tls::TlsInspector;
use futures::future::join_all;
use sonar_core::{PortOutcome, Result, ScanOptions, ScanResult, ScanTarget};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Connect deadline used by [`ScanScheduler::scan_single`]
pub const SINGLE_PORT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Banner deadline used by [`ScanScheduler::scan_single`]
pub const SINGLE_BANNER_TIMEOUT: Duration = Duration::from_millis(2000);

/// Port scan scheduler
pub struct ScanScheduler<P = TcpConnectProbe> {
    prober: P,
    tls: TlsInspector,
}

impl ScanScheduler {
    /// Scheduler backed by real TCP connects
    pub fn new() -> Self {
        Self::with_prober(TcpConnectProbe)
    }
}

impl Default for ScanScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Prober> ScanScheduler<P> {
    pub fn with_prober(prober: P) -> Self {
        Self {
            prober,
            tls: TlsInspector::new(),
        }
    }

    pub fn with_tls_inspector(mut self, tls: TlsInspector) -> Self {
        self.tls = tls;
        self
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Scan `host` over the ports named by `port_spec`.
    ///
    /// `port_spec` goes through [`PortSet::parse`] unchanged; preset names are
    /// not recognised here and parse to an empty set.
    pub async fn scan(
        &self,
        host: &str,
        port_spec: &str,
        options: &ScanOptions,
    ) -> Result<ScanResult> {
        self.scan_with_cancel(host, port_spec, options, &CancellationToken::new())
            .await
    }

    /// Like [`scan`](Self::scan), checking `cancel` before every batch
    pub async fn scan_with_cancel(
        &self,
        host: &str,
        port_spec: &str,
        options: &ScanOptions,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        self.scan_port_set(host, &PortSet::parse(port_spec), options, cancel)
            .await
    }

    /// Resolve `host` once and scan an already parsed port set
    pub async fn scan_port_set(
        &self,
        host: &str,
        ports: &PortSet,
        options: &ScanOptions,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        let (target, ip) = resolve_host(host).await?;
        Ok(self.scan_ports(&target, ip, ports, options, cancel).await)
    }

    /// Scan an already resolved target
    pub async fn scan_ports(
        &self,
        target: &ScanTarget,
        ip: IpAddr,
        ports: &PortSet,
        options: &ScanOptions,
        cancel: &CancellationToken,
    ) -> ScanResult {
        let started = Instant::now();
        let batch_size = options.batch_size();
        let host = target.host();

        info!(
            "Scanning {} ({}): {} ports, {} at a time",
            host,
            ip,
            ports.len(),
            batch_size
        );

        let mut open = Vec::new();
        let mut scanned = 0usize;
        let mut cancelled = false;

        for batch in ports.batches(batch_size) {
            if cancel.is_cancelled() {
                info!("Scan of {} cancelled after {} ports", host, scanned);
                cancelled = true;
                break;
            }

            let settled = join_all(
                batch
                    .iter()
                    .map(|&port| self.scan_port(&host, SocketAddr::new(ip, port), options)),
            )
            .await;

            scanned += batch.len();
            open.extend(settled.into_iter().flatten());
        }

        let result = ScanResult::new(host, scanned, open, started.elapsed(), cancelled);
        info!(
            "Scan of {} finished: {}/{} open in {}",
            result.host,
            result.open_ports_count,
            result.total_ports_scanned,
            result.scan_time_formatted
        );
        result
    }

    /// Probe one port; open ports are enriched according to `options`
    async fn scan_port(
        &self,
        host: &str,
        addr: SocketAddr,
        options: &ScanOptions,
    ) -> Option<PortOutcome> {
        if !self.prober.probe(addr, options.timeout()).await.is_open() {
            return None;
        }

        let port = addr.port();
        debug!("{}:{} is open", host, port);

        let mut outcome = PortOutcome::open(port);
        if options.service_detection {
            outcome = outcome.with_service(service_name(port), protocol_tag(port));
        }

        if options.banner_grab {
            if is_tls_port(port) {
                outcome = outcome.with_tls(self.tls.inspect_at(addr, host).await);
            } else {
                let grabber = BannerGrabber::new().with_timeout(options.banner_timeout());
                outcome = outcome.with_banner(grabber.grab_at(addr).await);
            }
        }

        Some(outcome)
    }

    /// Deep inspection of one port: service, protocol, and a banner or TLS summary
    pub async fn scan_single(&self, host: &str, port: u16) -> Result<PortOutcome> {
        let (target, ip) = resolve_host(host).await?;
        let host = target.host();
        let addr = SocketAddr::new(ip, port);

        if !self.prober.probe(addr, SINGLE_PORT_TIMEOUT).await.is_open() {
            debug!("{}:{} is closed", host, port);
            return Ok(PortOutcome::closed(port));
        }

        let outcome = PortOutcome::open(port).with_service(service_name(port), protocol_tag(port));

        if is_tls_port(port) {
            let tls = self.tls.inspect_at(addr, &host).await;
            let summary = tls.as_ref().map(|descriptor| descriptor.summary());
            let outcome = outcome.with_tls(tls);
            return Ok(match summary {
                Some(summary) => outcome.with_banner(summary),
                None => outcome,
            });
        }

        let banner = BannerGrabber::new()
            .with_timeout(SINGLE_BANNER_TIMEOUT)
            .grab_at(addr)
            .await;
        Ok(outcome.with_banner(banner))
    }
}
