//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::domain::models::RelayConfig;

/// Collect orchestration run events and serve them over HTTP until the run
/// is over.
#[derive(Parser, Debug)]
#[command(name = "configurator-relay", version)]
#[command(about = "Embedded aggregation server for orchestration run events")]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Newline-delimited JSON event stream (stdin when omitted or `-`)
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Address to bind the query server to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Seconds to keep serving after the run ends
    #[arg(long = "grace-period", value_name = "SECS")]
    pub grace_period_secs: Option<u64>,

    /// Drop item results that do not belong to the open task
    #[arg(long)]
    pub strict_items: bool,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Flags win over file and environment configuration.
    pub fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.grace_period_secs {
            config.grace_period_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }

    /// Input path, `None` meaning stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|p| p.as_os_str() != "-")
    }
}
