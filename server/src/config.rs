//! Server configuration and command-line flags

use clap::Parser;
use gadget_shared::protocol::DEFAULT_PORT;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Configuration for the command server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,
    /// Root of the per-device command directories
    pub commands_dir: PathBuf,
    /// Verbose logging
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            commands_dir: PathBuf::from("commands"),
            debug: false,
        }
    }
}

/// Command delivery endpoint for polling gadget devices
#[derive(Parser, Debug)]
#[command(name = "gadget-server", version)]
pub struct Args {
    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding one sub-directory per device
    #[arg(long, default_value = "commands")]
    pub commands_dir: PathBuf,

    /// Debug mode (verbose logging)
    #[arg(long)]
    pub debug: bool,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            bind: SocketAddr::new(args.bind, args.port),
            commands_dir: args.commands_dir,
            debug: args.debug,
        }
    }
}
