//! wgpeer CLI
//!
//! Provisions and decommissions peers on a WireGuard gateway.
//!
//! # Usage
//!
//! ```bash
//! wgpeer add alice
//! wgpeer remove alice
//! wgpeer list --format json
//! wgpeer --interface wg1 check
//! ```

use clap::{Parser, Subcommand};
use commands::Failure;
use peersync::Provisioner;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "wgpeer")]
#[command(version)]
#[command(about = "WireGuard gateway peer provisioning", long_about = None)]
struct Cli {
    /// Configuration file (default /etc/wgpeer/config.toml)
    #[arg(long, short, env = "WGPEER_CONFIG")]
    config: Option<PathBuf>,

    /// WireGuard interface, overrides the configuration file
    #[arg(long, short, env = "WGPEER_INTERFACE")]
    interface: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "text")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a new peer and write its client profile
    Add { peer_name: String },
    /// Decommission a peer
    Remove { peer_name: String },
    /// List registered peers
    List,
    /// Compare the registry with the gateway configuration
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let config = config::resolve(cli.config.as_deref(), cli.interface)?;
    let provisioner = Provisioner::from_config(&config)?;

    match cli.command {
        Commands::Add { peer_name } => {
            commands::add::handle(&provisioner, &peer_name, cli.format).await
        }
        Commands::Remove { peer_name } => {
            commands::remove::handle(&provisioner, &peer_name, cli.format).await
        }
        Commands::List => commands::list::handle(&provisioner, cli.format),
        Commands::Check => commands::check::handle(&provisioner, cli.format),
    }
}
