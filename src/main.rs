//! CLI Entry Point for kudu-discovery
//!
//! # Usage
//!
//! List the masters known to a master:
//! ```bash
//! kudu-discovery list-masters --master kudu-master1.node.example:7051 --insecure --timeout 1s
//! ```
//!
//! Print the connection metadata for an address:
//! ```bash
//! kudu-discovery metadata --master 127.0.0.1:7051 --json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kudu_client::discover_masters;
use kudu_discovery::config::{DiscoveryConfig, TransportKind, DEFAULT_CONFIG_PATH};
use kudu_discovery::{logging, report};

#[derive(Parser)]
#[command(name = "kudu-discovery")]
#[command(about = "Discover the master replicas of a Kudu cluster", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MasterArgs {
    /// Master address as host:port (or [ipv6]:port)
    #[arg(long)]
    master: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a master for every master replica it knows about
    ListMasters {
        #[command(flatten)]
        target: MasterArgs,

        /// Deadline for the call, e.g. 500ms or 2s
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Use an unauthenticated plaintext channel
        #[arg(long, conflicts_with = "tls")]
        insecure: bool,

        /// Use TLS
        #[arg(long)]
        tls: bool,

        /// Server name to verify with TLS
        #[arg(long, requires = "tls")]
        tls_domain: Option<String>,
    },

    /// Print the connection metadata rendered for a master address
    Metadata {
        #[command(flatten)]
        target: MasterArgs,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = DiscoveryConfig::load_from(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    match cli.command {
        Commands::ListMasters {
            target,
            timeout,
            insecure,
            tls,
            tls_domain,
        } => {
            apply_master(&mut config, target.master.as_deref())?;
            if let Some(timeout) = timeout {
                config.timeout = timeout;
            }
            if insecure {
                config.transport = Some(TransportKind::Insecure);
            }
            if tls {
                config.transport = Some(TransportKind::Tls);
            }
            if tls_domain.is_some() {
                config.tls_domain = tls_domain;
            }
            list_masters(&config, target.json).await
        }
        Commands::Metadata { target } => {
            apply_master(&mut config, target.master.as_deref())?;
            logging::init_from_config(&config).map_err(anyhow::Error::msg)?;
            print_metadata(&config, target.json)
        }
    }
}

fn apply_master(config: &mut DiscoveryConfig, master: Option<&str>) -> Result<()> {
    if let Some(address) = master {
        config
            .master
            .set_master_address(address)
            .with_context(|| format!("invalid --master '{address}'"))?;
    }
    Ok(())
}

async fn list_masters(config: &DiscoveryConfig, json: bool) -> Result<()> {
    config.validate()?;
    logging::init_from_config(config).map_err(anyhow::Error::msg)?;

    let channel_config = config.channel_config()?;
    tracing::info!(
        master = %config.master,
        timeout = ?config.timeout,
        "Listing masters"
    );

    let masters = discover_masters(config.master.clone(), channel_config, config.timeout)
        .await
        .with_context(|| format!("listing masters via {}", config.master))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report::master_list_json(&masters))?);
    } else {
        println!("{}", report::master_list_text(&masters));
    }
    Ok(())
}

fn print_metadata(config: &DiscoveryConfig, json: bool) -> Result<()> {
    let metadata = config.master.render();
    if json {
        println!("{}", serde_json::to_string_pretty(&report::metadata_json(&metadata))?);
    } else {
        println!("{}", report::metadata_text(&metadata));
    }
    Ok(())
}
