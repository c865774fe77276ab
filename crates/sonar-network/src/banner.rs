//! Banner grabbing - protocol-specific probes to elicit service banners
//!
//! A grab always settles to text. Failures become bracketed markers such as
//! `[Timeout]` or `[Error: ...]` so callers can store the result as-is.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Returned for TLS ports instead of reading plaintext
pub const TLS_SENTINEL: &str = "[TLS encrypted - use TLS inspection]";

/// Accumulation stops once this many bytes have been read
pub const MAX_BUFFER_BYTES: usize = 2048;

/// Returned banners are cut to this many characters
pub const MAX_BANNER_CHARS: usize = 500;

/// Payload sent right after connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePayload {
    /// `HEAD / HTTP/1.0`
    Http,
    /// Nothing; FTP and SSH announce themselves
    Silent,
    /// `EHLO`
    Smtp,
    /// No plaintext exchange at all
    TlsRedirect,
    /// Bare CRLF
    Generic,
}

impl ProbePayload {
    /// Select the payload for a port
    pub fn for_port(port: u16) -> Self {
        match port {
            80 | 8080 | 8000 => ProbePayload::Http,
            21 | 22 => ProbePayload::Silent,
            25 => ProbePayload::Smtp,
            443 => ProbePayload::TlsRedirect,
            _ => ProbePayload::Generic,
        }
    }

    pub fn bytes(&self) -> &'static [u8] {
        match self {
            ProbePayload::Http => b"HEAD / HTTP/1.0\r\n\r\n",
            ProbePayload::Smtp => b"EHLO scan.local\r\n",
            ProbePayload::Generic => b"\r\n",
            ProbePayload::Silent | ProbePayload::TlsRedirect => b"",
        }
    }
}

/// Terminal state of one grab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerOutcome {
    /// Peer closed, or a newline or the buffer cap ended the read
    Closed(String),
    /// No data within the idle deadline; holds whatever arrived before it
    Timeout(String),
    /// Connect, write or read failed
    Errored(String),
    /// TLS port; nothing was sent or read
    TlsRedirect,
}

impl BannerOutcome {
    /// Text stored in a port's banner field
    pub fn into_text(self) -> String {
        match self {
            BannerOutcome::Closed(text) if text.is_empty() => "[No banner]".to_string(),
            BannerOutcome::Timeout(text) if text.is_empty() => "[Timeout]".to_string(),
            BannerOutcome::Closed(text) | BannerOutcome::Timeout(text) => text,
            BannerOutcome::Errored(reason) => format!("[Error: {}]", reason),
            BannerOutcome::TlsRedirect => TLS_SENTINEL.to_string(),
        }
    }
}

impl fmt::Display for BannerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clone().into_text())
    }
}

/// Banner grabber with per-port probe payloads
#[derive(Debug, Clone)]
pub struct BannerGrabber {
    /// Connect deadline, and idle deadline for each read
    timeout: Duration,
    max_buffer: usize,
}

impl Default for BannerGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl BannerGrabber {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            max_buffer: MAX_BUFFER_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Grab a banner from `host:port`; never fails
    pub async fn grab(&self, host: &str, port: u16) -> String {
        self.grab_outcome((host, port), port).await.into_text()
    }

    /// Grab from an already resolved address
    pub async fn grab_at(&self, addr: SocketAddr) -> String {
        self.grab_outcome(addr, addr.port()).await.into_text()
    }

    /// Run the connect / probe / buffer sequence and report the terminal state
    pub async fn grab_outcome<A: ToSocketAddrs>(&self, addr: A, port: u16) -> BannerOutcome {
        let outcome = self.grab_with(addr, ProbePayload::for_port(port)).await;
        debug!("Banner grab on port {} settled: {:?}", port, outcome);
        outcome
    }

    /// Connect and exchange `payload` whatever port `addr` names
    pub async fn grab_with<A: ToSocketAddrs>(
        &self,
        addr: A,
        payload: ProbePayload,
    ) -> BannerOutcome {
        if payload == ProbePayload::TlsRedirect {
            return BannerOutcome::TlsRedirect;
        }

        let stream = match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                trace!("Banner connect ({:?}) failed: {}", payload, e);
                return BannerOutcome::Errored(e.to_string());
            }
            Err(_) => {
                trace!("Banner connect ({:?}) timed out", payload);
                return BannerOutcome::Timeout(String::new());
            }
        };

        self.exchange(stream, payload).await
    }

    /// Send the payload, then read until newline, cap, close, error or idle timeout
    pub async fn exchange<S>(&self, mut stream: S, payload: ProbePayload) -> BannerOutcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let probe = payload.bytes();
        if !probe.is_empty() {
            match timeout(self.timeout, stream.write_all(probe)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return BannerOutcome::Errored(e.to_string()),
                Err(_) => return BannerOutcome::Timeout(String::new()),
            }
        }

        let mut buffer: Vec<u8> = Vec::with_capacity(self.max_buffer);
        let mut chunk = [0u8; 1024];

        loop {
            match timeout(self.timeout, stream.read(&mut chunk)).await {
                Err(_) => return BannerOutcome::Timeout(render(&buffer)),
                Ok(Ok(0)) => return BannerOutcome::Closed(render(&buffer)),
                Ok(Ok(n)) => {
                    let room = self.max_buffer - buffer.len();
                    buffer.extend_from_slice(&chunk[..n.min(room)]);
                    if buffer.contains(&b'\n') || buffer.len() >= self.max_buffer {
                        return BannerOutcome::Closed(render(&buffer));
                    }
                }
                Ok(Err(e)) => return BannerOutcome::Errored(e.to_string()),
            }
        }
    }
}

/// Lossy UTF-8, cut to the banner character limit
fn render(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer)
        .chars()
        .take(MAX_BANNER_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio::net::TcpListener;

    fn quick() -> BannerGrabber {
        BannerGrabber::new().with_timeout(Duration::from_millis(200))
    }

    #[test]
    fn test_payload_selection() {
        assert_eq!(ProbePayload::for_port(80), ProbePayload::Http);
        assert_eq!(ProbePayload::for_port(8000), ProbePayload::Http);
        assert_eq!(ProbePayload::for_port(21), ProbePayload::Silent);
        assert_eq!(ProbePayload::for_port(22), ProbePayload::Silent);
        assert_eq!(ProbePayload::for_port(25), ProbePayload::Smtp);
        assert_eq!(ProbePayload::for_port(443), ProbePayload::TlsRedirect);
        assert_eq!(ProbePayload::for_port(3306), ProbePayload::Generic);

        assert_eq!(ProbePayload::Http.bytes(), b"HEAD / HTTP/1.0\r\n\r\n");
        assert_eq!(ProbePayload::Smtp.bytes(), b"EHLO scan.local\r\n");
        assert_eq!(ProbePayload::Generic.bytes(), b"\r\n");
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(BannerOutcome::Closed(String::new()).into_text(), "[No banner]");
        assert_eq!(BannerOutcome::Timeout(String::new()).into_text(), "[Timeout]");
        assert_eq!(BannerOutcome::Timeout("220 hi".into()).into_text(), "220 hi");
        assert_eq!(
            BannerOutcome::Errored("refused".into()).into_text(),
            "[Error: refused]"
        );
        assert_eq!(BannerOutcome::TlsRedirect.to_string(), TLS_SENTINEL);
    }

    #[tokio::test]
    async fn test_tls_port_short_circuits() {
        // Unresolvable host: any connect attempt would produce an error marker
        let outcome = quick().grab_outcome(("host.invalid", 443), 443).await;
        assert_eq!(outcome, BannerOutcome::TlsRedirect);
        assert_eq!(quick().grab("host.invalid", 443).await, TLS_SENTINEL);
    }

    #[tokio::test]
    async fn test_http_probe_sends_head() {
        let (client, mut server) = duplex(4096);
        let server_task = tokio::spawn(async move {
            let mut request = [0u8; 64];
            let n = server.read(&mut request).await.unwrap();
            server
                .write_all(b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&request[..n]).to_string()
        });

        let outcome = quick().exchange(client, ProbePayload::Http).await;
        let request = server_task.await.unwrap();

        assert_eq!(request, "HEAD / HTTP/1.0\r\n\r\n");
        match outcome {
            BannerOutcome::Closed(text) => assert!(text.starts_with("HTTP/1.0 200 OK")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_probe_reads_greeting() {
        let (client, mut server) = duplex(4096);
        server.write_all(b"SSH-2.0-OpenSSH_9.6\r\n").await.unwrap();

        let outcome = quick().exchange(client, ProbePayload::Silent).await;
        assert_eq!(outcome, BannerOutcome::Closed("SSH-2.0-OpenSSH_9.6\r\n".into()));
    }

    #[tokio::test]
    async fn test_peer_close_without_data() {
        let (client, server) = duplex(64);
        drop(server);

        let text = quick().exchange(client, ProbePayload::Silent).await.into_text();
        assert_eq!(text, "[No banner]");
    }

    #[tokio::test]
    async fn test_idle_peer_times_out() {
        let (client, _server) = duplex(64);
        let text = quick().exchange(client, ProbePayload::Silent).await.into_text();
        assert_eq!(text, "[Timeout]");
    }

    #[tokio::test]
    async fn test_buffer_cap_and_truncation() {
        let (client, mut server) = duplex(8192);
        server.write_all(&[b'a'; 5000]).await.unwrap();

        let outcome = quick().exchange(client, ProbePayload::Silent).await;
        match outcome {
            BannerOutcome::Closed(text) => assert_eq!(text.chars().count(), MAX_BANNER_CHARS),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_data_kept_on_timeout() {
        let (client, mut server) = duplex(4096);
        server.write_all(b"220 partial").await.unwrap();

        let text = quick().exchange(client, ProbePayload::Silent).await.into_text();
        assert_eq!(text, "220 partial");
    }

    #[tokio::test]
    async fn test_refused_connection_is_error_marker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let text = quick().grab_at(addr).await;
        assert!(text.starts_with("[Error: "), "got {}", text);
    }

    #[tokio::test]
    async fn test_grab_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut probe = [0u8; 2];
            socket.read_exact(&mut probe).await.unwrap();
            assert_eq!(&probe, b"\r\n");
            socket.write_all(b"+OK ready\r\n").await.unwrap();
        });

        let text = quick().grab("127.0.0.1", addr.port()).await;
        assert_eq!(text, "+OK ready\r\n");
    }
}
