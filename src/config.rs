//! Agent configuration and command-line flags

use clap::Parser;
use gadget_shared::{protocol::DEFAULT_PORT, DeviceId};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the polling agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Device ID reported to the server
    pub device_id: DeviceId,
    /// Base URL of the gadget server
    pub server_url: String,
    /// Delay between polls
    pub poll_interval: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Program that receives each batch on stdin
    pub exec: Option<PathBuf>,
    /// Poll once and exit
    pub once: bool,
    /// Verbose logging
    pub debug: bool,
}

impl AgentConfig {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            server_url: format!("http://127.0.0.1:{DEFAULT_PORT}"),
            poll_interval: Duration::from_millis(5000),
            request_timeout: Duration::from_millis(3000),
            exec: None,
            once: false,
            debug: false,
        }
    }
}

/// Polls a gadget server for commands and acknowledges them
#[derive(Parser, Debug)]
#[command(name = "gadget-agent", version)]
pub struct Args {
    /// Device name to poll for
    #[arg(short, long)]
    pub device: DeviceId,

    /// Server base URL
    #[arg(short, long, default_value = "http://127.0.0.1:8086")]
    pub server: String,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub poll_interval_ms: u64,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub request_timeout_ms: u64,

    /// Program receiving each command batch on stdin
    #[arg(long)]
    pub exec: Option<PathBuf>,

    /// Poll a single time and exit
    #[arg(long)]
    pub once: bool,

    /// Debug mode (verbose logging)
    #[arg(long)]
    pub debug: bool,
}

impl From<Args> for AgentConfig {
    fn from(args: Args) -> Self {
        Self {
            server_url: args.server,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            exec: args.exec,
            once: args.once,
            debug: args.debug,
            ..Self::new(args.device)
        }
    }
}
