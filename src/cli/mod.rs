use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api::{self, AppState};
use crate::application::{LedgerService, SetupOutcome};
use crate::domain::{format_cents, parse_cents, Cents, DEFAULT_WALLET_COUNT};
use crate::io::{ExportFormat, Exporter};
use crate::logging::{self, LogFormat};
use crate::storage::StoreOptions;

/// Remitto - wallet-to-wallet transfers over HTTP
#[derive(Parser, Debug)]
#[command(name = "remitto")]
#[command(about = "A small wallet transfer service backed by SQLite")]
#[command(version)]
pub struct Cli {
    /// Database URL
    #[arg(long, global = true, env = "DATABASE_URL", default_value = "sqlite:remitto.db")]
    pub database_url: String,

    /// How long a transfer waits for a concurrent one to release its lock (ms)
    #[arg(long, global = true, env = "REMITTO_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Log output format
    #[arg(long, global = true, env = "REMITTO_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the schema and initial wallets, then serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "REMITTO_LISTEN", default_value = "0.0.0.0:8080")]
        listen: SocketAddr,

        #[command(flatten)]
        setup: SetupArgs,
    },

    /// Create the schema and initial wallets without serving
    Init {
        #[command(flatten)]
        setup: SetupArgs,
    },

    /// List wallets and their balances
    Wallets,

    /// Transfer money between two wallets
    Send {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Sender wallet address
        #[arg(long)]
        from: String,

        /// Recipient wallet address
        #[arg(long)]
        to: String,
    },

    /// Show the most recent transactions
    History {
        /// Number of transactions to show
        #[arg(short = 'n', long, default_value_t = 10, allow_negative_numbers = true)]
        count: i64,
    },

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export
        #[arg(value_enum)]
        export_type: ExportType,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (snapshots are always JSON)
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
}

/// Settings for the first-boot wallet setup
#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Number of wallets created when the database has none
    #[arg(long, env = "REMITTO_WALLET_COUNT", default_value_t = DEFAULT_WALLET_COUNT)]
    pub wallet_count: usize,

    /// Starting balance of each created wallet (e.g., "100.00")
    #[arg(long, env = "REMITTO_INITIAL_BALANCE", default_value = "100.00")]
    pub initial_balance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportType {
    Transactions,
    Wallets,
    Snapshot,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let default_level = match self.command {
            Commands::Serve { .. } => "remitto=info,tower_http=info",
            _ => "remitto=warn",
        };
        logging::init_logging(default_level, self.log_format);

        let options = StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            ..StoreOptions::default()
        };
        let service = LedgerService::init(&self.database_url, &options)
            .await
            .with_context(|| format!("Failed to open database {}", self.database_url))?;

        match self.command {
            Commands::Serve { listen, setup } => {
                run_setup(&service, &setup).await?;

                let listener = tokio::net::TcpListener::bind(listen)
                    .await
                    .with_context(|| format!("Failed to bind {}", listen))?;
                tracing::info!(%listen, "API server listening");

                api::serve(listener, AppState::new(service)).await?;
                tracing::info!("server stopped");
            }

            Commands::Init { setup } => {
                run_setup(&service, &setup).await?;
                println!("Database initialized: {}", self.database_url);
            }

            Commands::Wallets => {
                let wallets = service.list_wallets().await?;
                if wallets.is_empty() {
                    println!("No wallets found. Run `remitto init` first.");
                } else {
                    println!("{:<64}  {:>14}", "ADDRESS", "BALANCE");
                    println!("{}", "-".repeat(80));
                    for wallet in wallets {
                        println!("{:<64}  {:>14}", wallet.address, format_cents(wallet.balance));
                    }
                }
            }

            Commands::Send { amount, from, to } => {
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let tx = service.transfer(&from, &to, amount_cents).await?;
                println!(
                    "Sent {} {} -> {} ({})",
                    format_cents(tx.amount_cents),
                    tx.from_address,
                    tx.to_address,
                    tx.id
                );
            }

            Commands::History { count } => {
                let transactions = service.list_recent_transactions(count).await?;
                if transactions.is_empty() {
                    println!("No transactions yet.");
                } else {
                    for tx in transactions {
                        println!(
                            "{}  {}  {} -> {}  {:>12}",
                            tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            tx.id,
                            short_address(&tx.from_address),
                            short_address(&tx.to_address),
                            format_cents(tx.amount_cents)
                        );
                    }
                }
            }

            Commands::Check => run_check_command(&service).await?,

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                let writer: Box<dyn Write> = match &output {
                    Some(path) => Box::new(
                        File::create(path).with_context(|| format!("Failed to create {}", path))?,
                    ),
                    None => Box::new(io::stdout().lock()),
                };

                let exporter = Exporter::new(&service);
                let count = match export_type {
                    ExportType::Transactions => exporter.export_transactions(writer, format).await?,
                    ExportType::Wallets => exporter.export_wallets(writer, format).await?,
                    ExportType::Snapshot => {
                        let snapshot = exporter.export_snapshot(writer).await?;
                        snapshot.wallets.len() + snapshot.transactions.len()
                    }
                };

                if let Some(path) = output {
                    println!("Exported {} record(s) to {}", count, path);
                }
            }
        }

        Ok(())
    }
}

async fn run_setup(service: &LedgerService, setup: &SetupArgs) -> Result<()> {
    let balance: Cents = parse_cents(&setup.initial_balance)
        .context("Invalid initial balance. Use '100.00' or '100'")?;

    match service.initial_setup(setup.wallet_count, balance).await? {
        SetupOutcome::Created(wallets) => {
            println!(
                "Created {} wallet(s) with {} each",
                wallets.len(),
                format_cents(balance)
            );
        }
        SetupOutcome::AlreadyInitialized { wallet_count } => {
            println!("{} wallet(s) already exist", wallet_count);
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Wallets:      {}", report.wallet_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Total:        {}", format_cents(report.total_balance));
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

/// Abbreviate a 64-char address for table output.
fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["remitto", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { listen, setup } => {
                assert_eq!(listen.port(), 8080);
                assert_eq!(setup.wallet_count, 10);
                assert_eq!(setup.initial_balance, "100.00");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_history_accepts_count() {
        let cli = Cli::try_parse_from(["remitto", "history", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::History { count: 3 }));
    }

    #[test]
    fn test_short_address() {
        let address = "a".repeat(60) + "beef";
        assert_eq!(short_address(&address), "aaaaaa…beef");
        assert_eq!(short_address("alice"), "alice");
    }
}
