//! Service classification from well-known port numbers
//!
//! Static tables only; no banner matching or version detection.

use sonar_core::Protocol;

/// Conventional service name for a port, or `"unknown"`
pub fn service_name(port: u16) -> &'static str {
    match port {
        20 => "FTP-Data",
        21 => "FTP",
        22 => "SSH",
        23 => "Telnet",
        25 => "SMTP",
        53 => "DNS",
        80 => "HTTP",
        110 => "POP3",
        111 => "RPCbind",
        135 => "MSRPC",
        139 => "NetBIOS",
        143 => "IMAP",
        443 => "HTTPS",
        445 => "SMB",
        993 => "IMAPS",
        995 => "POP3S",
        1723 => "PPTP",
        3306 => "MySQL",
        3389 => "RDP",
        5432 => "PostgreSQL",
        5900 => "VNC",
        6379 => "Redis",
        8080 => "HTTP-Alt",
        8443 => "HTTPS-Alt",
        9200 => "Elasticsearch",
        27017 => "MongoDB",
        _ => "unknown",
    }
}

/// Coarse protocol tag for a port
pub fn protocol_tag(port: u16) -> Protocol {
    match port {
        443 | 8443 | 993 => Protocol::Tls,
        53 => Protocol::Udp,
        80 | 8080 => Protocol::Http,
        21 => Protocol::Ftp,
        22 => Protocol::Ssh,
        25 => Protocol::Smtp,
        _ => Protocol::Tcp,
    }
}

/// Whether open ports should be inspected over TLS instead of a plaintext banner
pub fn is_tls_port(port: u16) -> bool {
    protocol_tag(port) == Protocol::Tls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(service_name(22), "SSH");
        assert_eq!(service_name(443), "HTTPS");
        assert_eq!(service_name(27017), "MongoDB");
        assert_eq!(service_name(31337), "unknown");
    }

    #[test]
    fn test_table_covers_twenty_ports() {
        let known = (1..=u16::MAX)
            .filter(|&p| service_name(p) != "unknown")
            .count();
        assert!(known >= 20);
    }

    #[test]
    fn test_protocol_tags() {
        assert_eq!(protocol_tag(443), Protocol::Tls);
        assert_eq!(protocol_tag(8443), Protocol::Tls);
        assert_eq!(protocol_tag(993), Protocol::Tls);
        assert_eq!(protocol_tag(53), Protocol::Udp);
        assert_eq!(protocol_tag(8080), Protocol::Http);
        assert_eq!(protocol_tag(21), Protocol::Ftp);
        assert_eq!(protocol_tag(22), Protocol::Ssh);
        assert_eq!(protocol_tag(25), Protocol::Smtp);
        assert_eq!(protocol_tag(3306), Protocol::Tcp);
    }

    #[test]
    fn test_tls_ports() {
        assert!(is_tls_port(443));
        assert!(!is_tls_port(80));
    }
}
