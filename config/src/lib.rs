//! The node CLI and config definitions

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::net::IpAddr;

use clap::Parser;
use serde::{Deserialize, Serialize};
use util::telemetry::{LevelFilter, setup_env_logger};

use crate::parsing::parse_config_from_args;

pub mod parsing;

pub use parsing::{parse_command_line_args, parse_config_from_file};

// -------
// | CLI |
// -------

/// Defines the matcher node command line interface
#[derive(Debug, Parser, Serialize, Deserialize)]
#[clap(author, about, long_about = None)]
pub struct Cli {
    // ---------------
    // | Config File |
    // ---------------
    /// A config file to read from; command line flags override its entries
    #[clap(long, value_parser)]
    pub config_file: Option<String>,

    // -----------------------------
    // | Application Level Configs |
    // -----------------------------
    /// The period of the matching cycle, in whole seconds
    #[clap(long, value_parser, default_value = "5")]
    pub matching_interval: u64,
    /// The period of the ledger polling cycle, in whole seconds
    #[clap(long, value_parser, default_value = "2")]
    pub chain_poll_interval: u64,
    /// The number of threads the proof manager may use for proving
    #[clap(long, value_parser, default_value = "2")]
    pub proof_threads: usize,

    // --------------------
    // | Api Configuration |
    // --------------------
    /// The address to bind the HTTP API to, defaults to all interfaces
    #[clap(long, value_parser, default_value = "0.0.0.0", env = "BIND_ADDR")]
    pub bind_addr: IpAddr,
    /// The port to serve the HTTP API on
    #[clap(long, value_parser, default_value = "3000", env = "HTTP_PORT")]
    pub http_port: u16,

    // -------------
    // | Telemetry |
    // -------------
    /// Whether to run the node with debug logging
    #[clap(short, long, value_parser, default_value = "false")]
    pub debug: bool,
}

// ----------
// | Config |
// ----------

/// Defines the system config for the matcher node
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// The period of the matching cycle, in whole seconds
    pub matching_interval: u64,
    /// The period of the ledger polling cycle, in whole seconds
    pub chain_poll_interval: u64,
    /// The number of threads the proof manager may use for proving
    pub proof_threads: usize,
    /// The address to bind the HTTP API to
    pub bind_addr: IpAddr,
    /// The port to serve the HTTP API on
    pub http_port: u16,
    /// Whether to run the node with debug logging
    pub debug: bool,
}

impl NodeConfig {
    /// Configure logging from the config
    pub fn configure_telemetry(&self) {
        let level = if self.debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
        setup_env_logger(level);
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        // Parse a dummy set of command line args and convert this to a config
        let cli = Cli::parse_from(Vec::<String>::new());
        parse_config_from_args(cli).expect("default config does not parse")
    }
}

/// Check the config for values that would misbehave at runtime
pub(crate) fn validate_config(config: &NodeConfig) -> Result<(), String> {
    if config.matching_interval == 0 {
        return Err("matching-interval must be at least one second".to_string());
    }

    if config.chain_poll_interval == 0 {
        return Err("chain-poll-interval must be at least one second".to_string());
    }

    if config.proof_threads == 0 {
        return Err("proof-threads must be nonzero".to_string());
    }

    if config.http_port == 0 {
        return Err("http-port must be nonzero".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{NodeConfig, validate_config};

    /// Tests that the default config passes validation
    #[test]
    fn test_default_config_valid() {
        let config = NodeConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    /// Tests that a zero-period timer is rejected
    #[test]
    fn test_zero_interval_rejected() {
        let config = NodeConfig { matching_interval: 0, ..Default::default() };
        assert!(validate_config(&config).is_err());
    }
}
