use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{format_cents, Transaction, Wallet};

/// Output format for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Full ledger snapshot: every wallet and the whole transaction log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub wallets: Vec<Wallet>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for writing ledger data out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export the transaction log, oldest first. Returns the number of rows.
    pub async fn export_transactions<W: Write>(
        &self,
        writer: W,
        format: ExportFormat,
    ) -> Result<usize> {
        let transactions = self.service.list_all_transactions().await?;

        match format {
            ExportFormat::Json => write_json(writer, &transactions)?,
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                csv_writer.write_record([
                    "uuid",
                    "timestamp",
                    "from_address",
                    "to_address",
                    "amount_cents",
                    "amount",
                ])?;

                for tx in &transactions {
                    csv_writer.write_record([
                        tx.id.to_string(),
                        tx.timestamp.to_rfc3339(),
                        tx.from_address.clone(),
                        tx.to_address.clone(),
                        tx.amount_cents.to_string(),
                        format_cents(tx.amount_cents),
                    ])?;
                }
                csv_writer.flush()?;
            }
        }

        Ok(transactions.len())
    }

    /// Export every wallet with its balance. Returns the number of rows.
    pub async fn export_wallets<W: Write>(&self, writer: W, format: ExportFormat) -> Result<usize> {
        let wallets = self.service.list_wallets().await?;

        match format {
            ExportFormat::Json => write_json(writer, &wallets)?,
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                csv_writer.write_record(["address", "balance_cents", "balance", "created_at"])?;

                for wallet in &wallets {
                    csv_writer.write_record([
                        wallet.address.clone(),
                        wallet.balance.to_string(),
                        format_cents(wallet.balance),
                        wallet.created_at.to_rfc3339(),
                    ])?;
                }
                csv_writer.flush()?;
            }
        }

        Ok(wallets.len())
    }

    /// Export the full ledger as a JSON snapshot
    pub async fn export_snapshot<W: Write>(&self, writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            wallets: self.service.list_wallets().await?,
            transactions: self.service.list_all_transactions().await?,
        };

        write_json(writer, &snapshot)?;
        Ok(snapshot)
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
