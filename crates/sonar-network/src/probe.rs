//! Connectivity probing - TCP connect scan of a single port

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Settled result of one probe. Every failure path ends here; nothing is raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Handshake completed
    Open,
    /// Peer answered with a reset
    Closed,
    /// Timed out or failed for another reason
    Errored(String),
}

impl ProbeOutcome {
    pub fn is_open(&self) -> bool {
        matches!(self, ProbeOutcome::Open)
    }
}

/// Decides whether a port accepts connections
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: SocketAddr, timeout: Duration) -> ProbeOutcome;
}

/// Full-handshake connect probe; the socket is dropped as soon as it opens
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectProbe;

#[async_trait]
impl Prober for TcpConnectProbe {
    async fn probe(&self, addr: SocketAddr, deadline: Duration) -> ProbeOutcome {
        trace!("TCP connect probe {}", addr);

        match timeout(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                trace!("{} is open", addr);
                ProbeOutcome::Open
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                trace!("{} is closed (RST)", addr);
                ProbeOutcome::Closed
            }
            Ok(Err(e)) => {
                trace!("{} error: {}", addr, e);
                ProbeOutcome::Errored(e.to_string())
            }
            Err(_) => {
                trace!("{} timed out", addr);
                ProbeOutcome::Errored("timed out".to_string())
            }
        }
    }
}

/// `true` when `addr` accepts a TCP connection within `deadline`
pub async fn is_port_open(addr: SocketAddr, deadline: Duration) -> bool {
    TcpConnectProbe.probe(addr, deadline).await.is_open()
}
