//! Trade Signal Relay
//!
//! Receives master trading signals on a webhook and mirrors them as pending
//! orders on a slave trading account, sizing each order from the slave's own
//! balance.

mod api;
mod models;
mod relay;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{BridgeClient, PaperConfig, PaperVenue, TerminalLogin, TradingVenue};
use crate::relay::{sizing, ConnectionGate, RelayConfig, SignalRelay};
use crate::server::RelayServer;

/// Trade signal relay CLI.
#[derive(Parser)]
#[command(name = "sigrelay")]
#[command(about = "Mirror master trading signals onto a slave account", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "RELAY_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Shared secret signals must carry
        #[arg(long, env = "RELAY_SECRET", hide_env_values = true)]
        secret: String,

        /// Terminal bridge base URL
        #[arg(long, env = "TERMINAL_BRIDGE_URL", default_value = "http://127.0.0.1:5000")]
        bridge_url: String,

        /// Terminal account number
        #[arg(long, env = "TERMINAL_LOGIN", requires_all = ["password", "server"])]
        login: Option<u64>,

        /// Terminal account password
        #[arg(long, env = "TERMINAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Broker trade server name
        #[arg(long, env = "TERMINAL_SERVER")]
        server: Option<String>,

        /// Seconds a signal waits for the terminal connection
        #[arg(long, default_value = "10")]
        ready_timeout: u64,

        /// Simulate the terminal in memory (no real orders)
        #[arg(long)]
        dry_run: bool,

        /// Starting balance of the simulated account
        #[arg(long, default_value = "10000")]
        paper_balance: Decimal,
    },

    /// Show current configuration
    Config,

    /// Show the lot size a balance produces
    Size {
        /// Account balance
        #[arg(short, long)]
        balance: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment fallbacks for the CLI come from .env when present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            bind,
            secret,
            bridge_url,
            login,
            password,
            server,
            ready_timeout,
            dry_run,
            paper_balance,
        } => {
            if secret.is_empty() {
                anyhow::bail!("RELAY_SECRET must not be empty");
            }

            let config = RelayConfig {
                ready_timeout: Duration::from_secs(ready_timeout),
                ..RelayConfig::with_secret(secret)
            };

            let venue: Arc<dyn TradingVenue> = if dry_run {
                info!(balance = %paper_balance, "Using paper terminal");
                Arc::new(PaperVenue::new(PaperConfig {
                    initial_balance: paper_balance,
                    ..Default::default()
                }))
            } else {
                let terminal_login = match (login, password, server) {
                    (Some(login), Some(password), Some(server)) => Some(TerminalLogin {
                        login,
                        password,
                        server,
                    }),
                    _ => None,
                };
                let client = BridgeClient::new(&bridge_url, terminal_login)?;
                info!(url = %client.base_url(), "Using terminal bridge");
                Arc::new(client)
            };

            info!(
                bind = %bind,
                dry_run = dry_run,
                ready_timeout = ready_timeout,
                "Starting signal relay"
            );

            // Connect in the background; signals wait on the gate
            let gate = Arc::new(ConnectionGate::new(
                Arc::clone(&venue),
                config.connect_attempts,
                config.connect_retry_delay,
            ));
            gate.start();

            let relay = Arc::new(SignalRelay::new(config, venue, Arc::clone(&gate)));
            let served = server::serve(RelayServer::new(relay), bind).await;

            if let Err(e) = gate.shutdown().await {
                tracing::error!(error = %e, "Terminal shutdown failed");
            }
            served?;
        }

        Commands::Config => {
            let config = RelayConfig::default();

            println!("\n=== Relay Configuration ===\n");
            println!("Connection:");
            println!("  Connect Attempts:     {}", config.connect_attempts);
            println!("  Retry Delay:          {}s", config.connect_retry_delay.as_secs());
            println!("  Ready Timeout:        {}s", config.ready_timeout.as_secs());

            println!("\nOrders:");
            println!("  Magic Number:         {}", config.magic);
            println!("  Deviation:            {} points", config.deviation);
            println!("  Time In Force:        GTC");
            println!("  Fill Policy:          RETURN");

            println!("\nSizing:");
            println!("  Formula:              balance / 10000 / 2, half-up to 0.01");
            println!("  Minimum Lot:          {}", sizing::MIN_VOLUME);
        }

        Commands::Size { balance } => {
            let volume = sizing::volume_for_balance(balance);
            println!("Balance {} -> {} lots", balance, volume);
        }
    }

    Ok(())
}
