//! Command line flags

use clap::Parser;
use std::path::PathBuf;

use crate::api::DEFAULT_API_ADDR;
use crate::config::BaseConfig;
use crate::tls::{DEFAULT_CERT_FILE, DEFAULT_KEY_FILE};

#[derive(Parser, Debug, Clone)]
#[command(name = "relay-rs", about = "Relay control plane with a runtime route API", version)]
pub struct Cli {
    /// Listen address, repeat to listen on several ports
    #[arg(short = 'L', value_name = "NODE")]
    pub serve_nodes: Vec<String>,

    /// Forward address, repeat to build a forwarding chain
    #[arg(short = 'F', value_name = "NODE")]
    pub chain_nodes: Vec<String>,

    /// Configuration file
    #[arg(short = 'C', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'D')]
    pub debug: bool,

    /// Control API listen address
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_API_ADDR)]
    pub api: String,

    /// TLS certificate file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CERT_FILE)]
    pub cert: PathBuf,

    /// TLS private key file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_KEY_FILE)]
    pub key: PathBuf,
}

impl Cli {
    /// Overlay the flags on a loaded configuration
    pub fn apply(&self, config: &mut BaseConfig) {
        if !self.serve_nodes.is_empty() {
            config.route.serve_nodes = self.serve_nodes.clone();
        }
        if !self.chain_nodes.is_empty() {
            config.route.chain_nodes = self.chain_nodes.clone();
        }
        config.debug |= self.debug;
    }
}
