//! sonar - port scanner, banner grabber and ping sweeper
//!
//! Command-line front end for the sonar engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use sonar_common::logging::{init_logging_with_config, LogConfig, LogFormat};
use sonar_common::Config;
use sonar_core::{Error, PortOutcome, ScanResult};
use sonar_network::{
    local_networks, ping_host, BannerGrabber, HostDiscovery, LocalNetwork, PingProbe, PortSet,
    ScanScheduler, SweepConfig, TlsInspector, TOP_100, TOP_20,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Network reconnaissance from the command line
#[derive(Parser, Debug)]
#[command(name = "sonar")]
#[command(version)]
#[command(
    about = "TCP port scanner with banner grabbing, TLS inspection and ping sweeps",
    long_about = None
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "sonar.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json, compact); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one or more hosts
    Scan {
        #[arg(required = true)]
        hosts: Vec<String>,

        /// Port spec such as "22,80,8000-8100", or top20, top100, all
        #[arg(short, long, default_value = "top100")]
        ports: String,

        /// Connect timeout per port in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Ports probed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip service and protocol classification
        #[arg(long)]
        no_service_detection: bool,

        /// Grab banners and inspect TLS on open ports
        #[arg(long)]
        banners: bool,
    },

    /// Inspect a single port in depth
    Single { host: String, port: u16 },

    /// Grab the banner of one port
    Banner {
        host: String,
        port: u16,

        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },

    /// Show the TLS session and certificate of an endpoint
    Tls {
        host: String,

        #[arg(default_value_t = 443)]
        port: u16,
    },

    /// Ping sweep a subnet; without one, every local network is swept
    Discover {
        /// Subnet base such as 192.168.1.0 or 192.168.1.0/24
        subnet: Option<String>,

        #[arg(long, default_value_t = 24)]
        cidr: u8,
    },

    /// List local IPv4 networks
    Interfaces,

    /// Ping one host
    Ping { host: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    let mut log_config = LogConfig::from_section(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config = log_config.level(level.clone());
    }
    if let Some(format) = &cli.log_format {
        let format: LogFormat = format.parse().map_err(anyhow::Error::msg)?;
        log_config = log_config.format(format);
    }
    init_logging_with_config(log_config);

    debug!("sonar {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Scan {
            hosts,
            ports,
            timeout_ms,
            concurrency,
            no_service_detection,
            banners,
        } => {
            let mut options = config.scan.clone();
            if let Some(timeout_ms) = timeout_ms {
                options = options.with_timeout_ms(timeout_ms);
            }
            if let Some(concurrency) = concurrency {
                options = options.with_concurrency(concurrency);
            }
            if no_service_detection {
                options = options.with_service_detection(false);
            }
            if banners {
                options = options.with_banner_grab(true);
            }

            let ports = resolve_ports(&ports);
            let cancel = cancel_on_ctrl_c();
            let scheduler = ScanScheduler::new();
            let mut reports: Vec<Value> = Vec::with_capacity(hosts.len());

            for host in &hosts {
                if cancel.is_cancelled() {
                    warn!("Cancelled; skipping remaining hosts");
                    break;
                }

                match scheduler
                    .scan_port_set(host, &ports, &options, &cancel)
                    .await
                {
                    Ok(result) => {
                        if cli.json {
                            reports.push(serde_json::to_value(&result)?);
                        } else {
                            print_scan(&result);
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        error!("Scan of {} failed: {}", host, e);
                        if cli.json {
                            reports.push(json!({
                                "host": host,
                                "error": e.to_string(),
                                "code": e.code(),
                            }));
                        } else {
                            println!("{}: {}", host, e);
                        }
                    }
                }
            }

            if cli.json {
                print_json(&reports)?;
            }
            if cancel.is_cancelled() {
                return Err(Error::ScanCancelled {
                    reason: "interrupted".to_string(),
                }
                .into());
            }
        }

        Command::Single { host, port } => {
            let outcome = ScanScheduler::new().scan_single(&host, port).await?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                print_outcome_header();
                print_outcome(&outcome);
            }
        }

        Command::Banner {
            host,
            port,
            timeout_ms,
        } => {
            let banner = BannerGrabber::new()
                .with_timeout(Duration::from_millis(timeout_ms))
                .grab(&host, port)
                .await;
            if cli.json {
                print_json(&json!({ "host": host, "port": port, "banner": banner }))?;
            } else {
                println!("{}", banner.trim_end());
            }
        }

        Command::Tls { host, port } => {
            let descriptor = TlsInspector::new().inspect(&host, port).await;
            if cli.json {
                print_json(&descriptor)?;
            } else {
                match descriptor {
                    Some(tls) => {
                        println!("Protocol:  {}", tls.negotiated_protocol_version);
                        println!("Cipher:    {}", tls.cipher_suite);
                        println!("Subject:   {}", tls.subject);
                        println!("Issuer:    {}", tls.issuer);
                        println!("Valid:     {} to {}", tls.valid_from, tls.valid_to);
                        println!("Serial:    {}", tls.serial_number);
                    }
                    None => println!("No TLS data from {}:{}", host, port),
                }
            }
        }

        Command::Discover { subnet, cidr } => {
            let ping_timeout = Duration::from_millis(config.discovery.ping_timeout_ms);
            let discovery = HostDiscovery::with_probe(PingProbe::new().with_timeout(ping_timeout))
                .with_config(SweepConfig {
                    host_limit: config.discovery.host_limit as usize,
                    concurrency: config.discovery.concurrency,
                });

            match subnet {
                Some(subnet) => {
                    let (base, prefix) = split_subnet(&subnet, cidr)?;
                    let hosts = discovery.sweep(base, prefix).await?;
                    if cli.json {
                        print_json(&hosts)?;
                    } else {
                        for host in &hosts {
                            println!("{}", host);
                        }
                        info!("{} hosts up", hosts.len());
                    }
                }
                None => {
                    let sweeps = discovery.discover_local().await?;
                    if cli.json {
                        print_json(&sweeps)?;
                    } else {
                        for sweep in &sweeps {
                            println!("{} ({})", sweep.network.cidr, sweep.network.interface);
                            for host in &sweep.hosts {
                                println!("  {}", host);
                            }
                        }
                    }
                }
            }
        }

        Command::Interfaces => {
            let networks = local_networks();
            if cli.json {
                print_json(&networks)?;
            } else {
                print_networks(&networks);
            }
        }

        Command::Ping { host } => {
            let alive = ping_host(&host).await;
            if cli.json {
                print_json(&json!({ "host": host, "alive": alive }))?;
            } else {
                println!("{} is {}", host, if alive { "up" } else { "down" });
            }
        }
    }

    Ok(())
}

/// File config when present, then `SONAR_*` overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        Config::default()
    };
    Ok(config.merge_env())
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping after the current batch");
            token.cancel();
        }
    });
    cancel
}

/// Expand a preset name (`top20`, `top100`, `all`) or parse a port spec
fn resolve_ports(spec: &str) -> PortSet {
    match spec.trim().to_ascii_lowercase().as_str() {
        "top20" => PortSet::from_ports(TOP_20.iter().copied()),
        "top100" => PortSet::from_ports(TOP_100.iter().copied()),
        "all" => PortSet::all(),
        _ => PortSet::parse(spec),
    }
}

/// `"10.0.0.0/16"` carries its own prefix; a bare address uses `default_prefix`
fn split_subnet(subnet: &str, default_prefix: u8) -> Result<(&str, u8)> {
    match subnet.split_once('/') {
        Some((base, prefix)) => {
            let prefix = prefix
                .trim()
                .parse()
                .with_context(|| format!("invalid prefix in {}", subnet))?;
            Ok((base, prefix))
        }
        None => Ok((subnet, default_prefix)),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_scan(result: &ScanResult) {
    println!(
        "{}: {}/{} ports open in {}{}",
        result.host,
        result.open_ports_count,
        result.total_ports_scanned,
        result.scan_time_formatted,
        if result.cancelled { " (cancelled)" } else { "" }
    );
    if result.ports.is_empty() {
        return;
    }

    print_outcome_header();
    for outcome in &result.ports {
        print_outcome(outcome);
    }
    println!();
}

fn print_outcome_header() {
    println!(
        "  {:<8} {:<7} {:<16} {:<6} DETAIL",
        "PORT", "STATE", "SERVICE", "PROTO"
    );
}

fn print_outcome(outcome: &PortOutcome) {
    let detail = outcome
        .tls
        .as_ref()
        .map(|tls| tls.summary())
        .or_else(|| outcome.banner.as_ref().map(|b| first_line(b)))
        .unwrap_or_default();

    println!(
        "  {:<8} {:<7} {:<16} {:<6} {}",
        outcome.port,
        outcome.state.as_str(),
        outcome.service.as_deref().unwrap_or("-"),
        outcome.protocol.map(|p| p.as_str()).unwrap_or("-"),
        detail
    );
}

fn print_networks(networks: &[LocalNetwork]) {
    if networks.is_empty() {
        println!("No IPv4 networks found");
        return;
    }
    for network in networks {
        println!(
            "{:<16} {:<16} {:<20} {}",
            network.interface,
            network.ip,
            network.cidr,
            network.mac.as_deref().unwrap_or("-")
        );
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::parse_from([
            "sonar",
            "--json",
            "scan",
            "10.0.0.1",
            "example.com",
            "--ports",
            "22,80",
            "--concurrency",
            "10",
            "--banners",
        ]);
        assert!(cli.json);
        match cli.command {
            Command::Scan {
                hosts,
                ports,
                concurrency,
                banners,
                no_service_detection,
                ..
            } => {
                assert_eq!(hosts, vec!["10.0.0.1", "example.com"]);
                assert_eq!(ports, "22,80");
                assert_eq!(concurrency, Some(10));
                assert!(banners);
                assert!(!no_service_detection);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sonar", "tls", "example.com"]);
        assert_eq!(cli.config, PathBuf::from("sonar.toml"));
        assert!(matches!(cli.command, Command::Tls { port: 443, .. }));

        let cli = Cli::parse_from(["sonar", "discover"]);
        assert!(matches!(
            cli.command,
            Command::Discover {
                subnet: None,
                cidr: 24
            }
        ));
    }

    #[test]
    fn test_scan_requires_host() {
        assert!(Cli::try_parse_from(["sonar", "scan"]).is_err());
    }

    #[test]
    fn test_resolve_ports_presets() {
        assert_eq!(resolve_ports("top20").len(), 20);
        assert_eq!(resolve_ports("TOP100").len(), 100);
        assert_eq!(resolve_ports(" all ").len(), 65535);
        assert_eq!(resolve_ports("80,22").as_slice(), &[22, 80]);
        assert!(resolve_ports("top").is_empty());
    }

    #[test]
    fn test_split_subnet() {
        assert_eq!(split_subnet("10.0.0.0/16", 24).unwrap(), ("10.0.0.0", 16));
        assert_eq!(split_subnet("192.168.1.0", 24).unwrap(), ("192.168.1.0", 24));
        assert!(split_subnet("10.0.0.0/x", 24).is_err());
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("HTTP/1.0 200 OK\r\nServer: x\r\n"), "HTTP/1.0 200 OK");
        assert_eq!(first_line(""), "");
    }
}
