//! TLS inspection - handshake and certificate summary without trust checks
//!
//! Whatever certificate the peer presents is accepted, including self-signed
//! and expired ones. Any failure yields `None`.

use sonar_core::TlsDescriptor;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    self, ClientConfig, DigitallySignedStruct, ProtocolVersion, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};
use x509_parser::parse_x509_certificate;

/// Whole-inspection budget: connect, handshake and close
pub const TLS_TIMEOUT: Duration = Duration::from_secs(3);

/// Accepts every server certificate; handshake signatures are still checked
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn insecure_connector() -> io::Result<TlsConnector> {
    let provider = Arc::new(crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(io::Error::other)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// TLS inspector
#[derive(Debug, Clone)]
pub struct TlsInspector {
    timeout: Duration,
}

impl Default for TlsInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsInspector {
    pub fn new() -> Self {
        Self {
            timeout: TLS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handshake with `host:port` and summarise the session
    pub async fn inspect(&self, host: &str, port: u16) -> Option<TlsDescriptor> {
        self.inspect_with_name((host, port), host).await
    }

    /// Handshake with a resolved address, sending `host` as SNI when it is a valid name
    pub async fn inspect_at(&self, addr: SocketAddr, host: &str) -> Option<TlsDescriptor> {
        self.inspect_with_name(addr, host).await
    }

    async fn inspect_with_name<A: ToSocketAddrs>(
        &self,
        addr: A,
        host: &str,
    ) -> Option<TlsDescriptor> {
        match timeout(self.timeout, handshake(addr, host)).await {
            Ok(Ok(descriptor)) => {
                debug!(
                    "TLS {} {} on {}",
                    descriptor.negotiated_protocol_version, descriptor.cipher_suite, host
                );
                Some(descriptor)
            }
            Ok(Err(e)) => {
                debug!("TLS inspection of {} failed: {}", host, e);
                None
            }
            Err(_) => {
                debug!("TLS inspection of {} timed out", host);
                None
            }
        }
    }
}

async fn handshake<A: ToSocketAddrs>(addr: A, host: &str) -> io::Result<TlsDescriptor> {
    let tcp = TcpStream::connect(addr).await?;
    let server_name = match ServerName::try_from(host) {
        Ok(name) => name.to_owned(),
        Err(_) => ServerName::IpAddress(tcp.peer_addr()?.ip().into()),
    };

    trace!("TLS handshake with {:?}", server_name);
    let mut stream = insecure_connector()?.connect(server_name, tcp).await?;

    let descriptor = {
        let (_, session) = stream.get_ref();
        let negotiated_protocol_version = session
            .protocol_version()
            .map(protocol_name)
            .unwrap_or_else(|| "unknown".to_string());
        let cipher_suite = session
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
            .unwrap_or_else(|| "unknown".to_string());
        let leaf = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| cert.as_ref().to_vec());

        describe(negotiated_protocol_version, cipher_suite, leaf.as_deref())
    };

    let _ = stream.shutdown().await;
    Ok(descriptor)
}

fn protocol_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_1 => "TLSv1.1".to_string(),
        ProtocolVersion::TLSv1_0 => "TLSv1".to_string(),
        other => format!("{:?}", other),
    }
}

/// Build a descriptor; certificate fields read "unknown" when the leaf is missing or unparsable
fn describe(protocol: String, cipher: String, leaf_der: Option<&[u8]>) -> TlsDescriptor {
    let unknown = || "unknown".to_string();
    let mut descriptor = TlsDescriptor {
        negotiated_protocol_version: protocol,
        cipher_suite: cipher,
        subject: unknown(),
        issuer: unknown(),
        valid_from: unknown(),
        valid_to: unknown(),
        serial_number: unknown(),
    };

    let Some(der) = leaf_der else {
        return descriptor;
    };

    match parse_x509_certificate(der) {
        Ok((_, cert)) => {
            let validity = cert.validity();
            descriptor.subject = cert.subject().to_string();
            descriptor.issuer = cert.issuer().to_string();
            descriptor.valid_from = validity
                .not_before
                .to_rfc2822()
                .unwrap_or_else(|_| validity.not_before.to_string());
            descriptor.valid_to = validity
                .not_after
                .to_rfc2822()
                .unwrap_or_else(|_| validity.not_after.to_string());
            descriptor.serial_number = cert.raw_serial_as_string();
        }
        Err(e) => trace!("Unparsable peer certificate: {}", e),
    }

    descriptor
}
