//! Command-line configuration for the gateway binary.

use clap::Parser;

use crate::router::LINK_COUNT;

/// Bridges serial links carrying framed ECU messages to a TCP segment.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Serial device path for each link, in link-index order (node 1, 2, 3).
    /// May be repeated up to three times; missing entries fall back to the
    /// documented default path for that link.
    #[arg(long = "serial", value_name = "PATH")]
    pub serial_ports: Vec<String>,

    /// Baud rate shared by every serial link.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,

    /// TCP port PC clients connect to.
    #[arg(short, long, default_value_t = 9100)]
    pub port: u16,

    /// Maximum number of concurrently connected TCP clients.
    #[arg(long, default_value_t = 8)]
    pub max_clients: usize,

    /// Increase log verbosity; may be repeated (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Encode and enqueue one self-test frame on link 0 at startup, then exit.
    /// Mirrors the collaborator firmware-update tool's own `-send_test` probe
    /// flag; useful for verifying a serial cable without a live ECU attached.
    #[arg(long)]
    pub send_test: bool,
}

/// Default serial device paths, in link-index order, when `--serial` is
/// supplied fewer than [`LINK_COUNT`] times.
pub const DEFAULT_SERIAL_PORTS: [&str; LINK_COUNT] = ["/dev/ttyS1", "/dev/ttyS4", "/dev/ttyS5"];

/// Fully resolved, immutable configuration the event loop is built from.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub serial_ports: [String; LINK_COUNT],
    pub baud: u32,
    pub port: u16,
    pub max_clients: usize,
    pub send_test: bool,
}

impl From<Cli> for GatewayConfig {
    fn from(cli: Cli) -> Self {
        let mut serial_ports = DEFAULT_SERIAL_PORTS.map(String::from);
        for (slot, provided) in serial_ports.iter_mut().zip(cli.serial_ports.into_iter()) {
            *slot = provided;
        }
        GatewayConfig {
            serial_ports,
            baud: cli.baud,
            port: cli.port,
            max_clients: cli.max_clients,
            send_test: cli.send_test,
        }
    }
}

/// Translates `-v` repeat count into a `tracing` filter directive.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
