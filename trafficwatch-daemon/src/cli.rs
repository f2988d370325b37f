//! CLI argument definitions for trafficwatch-daemon.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use trafficwatch_core::config::GeneralConfig;

/// Network traffic monitor.
///
/// Captures interface traffic and tails proxy access logs, then writes the
/// records to rotating files. `init-nginx` prepares nginx for the log tail.
#[derive(Parser, Debug)]
#[command(name = "trafficwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the configuration file (TOML, or YAML for .yaml/.yml).
    #[arg(short, long, global = true, default_value = "/etc/trafficwatch/trafficwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Run a one-shot command instead of the daemon.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configure nginx to write the access log format the log tail reads.
    ///
    /// Uses `middleware.config`, `middleware.sites_dir` and
    /// `middleware.logs_dir` from the configuration file.
    InitNginx(InitNginxArgs),
}

#[derive(Args, Debug)]
pub struct InitNginxArgs {
    /// nginx executable used for `-v` and `-t` checks.
    #[arg(long, default_value = "nginx")]
    pub nginx_bin: PathBuf,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the loaded `[general]` section.
    pub fn apply_overrides(&self, general: &mut GeneralConfig) {
        if let Some(level) = &self.log_level {
            general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            general.log_format = format.clone();
        }
    }
}
