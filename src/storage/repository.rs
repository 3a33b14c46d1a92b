use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::{Cents, IntegrityStats, Transaction, Wallet};

use super::MIGRATION_001_INITIAL;

/// A write transaction on the underlying store.
/// Dropping it without calling `commit` rolls every change back.
pub type DbTransaction = sqlx::Transaction<'static, Sqlite>;

/// Connection settings for the SQLite store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a writer waits for another writer's lock before failing
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 8,
        }
    }
}

/// Repository for persisting and querying wallets and transactions.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database, creating the file if it doesn't exist.
    /// Connections run in WAL mode so readers never wait on a transfer.
    pub async fn connect(database_url: &str, options: &StoreOptions) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize the database (connect + migrate).
    pub async fn init(database_url: &str, options: &StoreOptions) -> Result<Self> {
        let repo = Self::connect(database_url, options).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Start a write transaction.
    pub async fn begin(&self) -> Result<DbTransaction> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    // ========================
    // Wallet operations
    // ========================

    /// Take the write lock inside `conn`'s transaction and return the number
    /// of wallets. Nothing else can create wallets until the transaction ends.
    pub async fn lock_wallets(conn: &mut SqliteConnection) -> Result<i64> {
        let result = sqlx::query("UPDATE wallets SET balance = balance")
            .execute(&mut *conn)
            .await
            .context("Failed to lock wallets")?;
        Ok(result.rows_affected() as i64)
    }

    /// Insert a batch of wallets inside `conn`'s transaction.
    pub async fn insert_wallets(conn: &mut SqliteConnection, wallets: &[Wallet]) -> Result<()> {
        for wallet in wallets {
            sqlx::query("INSERT INTO wallets (address, balance, created_at) VALUES (?, ?, ?)")
                .bind(&wallet.address)
                .bind(wallet.balance)
                .bind(encode_timestamp(wallet.created_at))
                .execute(&mut *conn)
                .await
                .with_context(|| format!("Failed to save wallet {}", wallet.address))?;
        }
        Ok(())
    }

    /// Get a wallet by address.
    pub async fn get_wallet(&self, address: &str) -> Result<Option<Wallet>> {
        let row = sqlx::query(
            r#"
            SELECT address, balance, created_at
            FROM wallets
            WHERE address = ?
            "#,
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet")?;

        row.as_ref().map(Self::row_to_wallet).transpose()
    }

    /// List all wallets, oldest first.
    pub async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let rows = sqlx::query(
            r#"
            SELECT address, balance, created_at
            FROM wallets
            ORDER BY created_at, address
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallets")?;

        rows.iter().map(Self::row_to_wallet).collect()
    }

    /// Take the write lock on a wallet row inside `conn`'s transaction and
    /// return its balance, or `None` if the wallet doesn't exist.
    ///
    /// The no-op update makes this the first write of the transaction, so the
    /// balance read here cannot be changed by a concurrent transfer before
    /// commit.
    pub async fn lock_wallet(conn: &mut SqliteConnection, address: &str) -> Result<Option<Cents>> {
        let row = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance
            WHERE address = ?
            RETURNING balance
            "#,
        )
        .bind(address)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to lock wallet")?;

        Ok(row.map(|row| row.get("balance")))
    }

    /// Add `delta` cents to a wallet's balance inside `conn`'s transaction.
    pub async fn adjust_balance(
        conn: &mut SqliteConnection,
        address: &str,
        delta: Cents,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE wallets SET balance = balance + ? WHERE address = ?")
            .bind(delta)
            .bind(address)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to update balance of wallet {}", address))?;

        if result.rows_affected() != 1 {
            anyhow::bail!("Wallet {} disappeared during update", address);
        }
        Ok(())
    }

    fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
        let created_at_str: String = row.get("created_at");

        Ok(Wallet {
            address: row.get("address"),
            balance: row.get("balance"),
            created_at: decode_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Append a transaction record inside `conn`'s transaction.
    pub async fn save_transaction(conn: &mut SqliteConnection, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (uuid, from_address, to_address, amount, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(&transaction.from_address)
        .bind(&transaction.to_address)
        .bind(transaction.amount_cents)
        .bind(encode_timestamp(transaction.timestamp))
        .execute(&mut *conn)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// List the most recent transactions, newest first.
    /// Entries sharing a timestamp come back in reverse insertion order.
    pub async fn list_recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT uuid, from_address, to_address, amount, timestamp
            FROM transactions
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List every transaction in insertion order.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT uuid, from_address, to_address, amount, timestamp
            FROM transactions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let uuid_str: String = row.get("uuid");
        let timestamp_str: String = row.get("timestamp");

        Ok(Transaction {
            id: Uuid::parse_str(&uuid_str).context("Invalid transaction UUID")?,
            from_address: row.get("from_address"),
            to_address: row.get("to_address"),
            amount_cents: row.get("amount"),
            timestamp: decode_timestamp(&timestamp_str).context("Invalid timestamp")?,
        })
    }

    // ========================
    // Integrity
    // ========================

    /// Gather the counters used by the integrity check.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let wallets = sqlx::query(
            r#"
            SELECT
                COUNT(*) as count,
                COALESCE(SUM(balance), 0) as total,
                COALESCE(SUM(CASE WHEN balance < 0 THEN 1 ELSE 0 END), 0) as negative
            FROM wallets
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate wallets")?;

        let transactions = sqlx::query(
            r#"
            SELECT
                COUNT(*) as count,
                COALESCE(SUM(CASE WHEN amount <= 0 THEN 1 ELSE 0 END), 0) as invalid_amounts,
                COALESCE(SUM(CASE WHEN from_address = to_address THEN 1 ELSE 0 END), 0) as self_transfers
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate transactions")?;

        let unknown_refs: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM wallets w WHERE w.address = t.from_address)
               OR NOT EXISTS (SELECT 1 FROM wallets w WHERE w.address = t.to_address)
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to check wallet references")?
        .get("count");

        Ok(IntegrityStats {
            wallet_count: wallets.get("count"),
            transaction_count: transactions.get("count"),
            total_balance: wallets.get("total"),
            negative_balances: wallets.get("negative"),
            invalid_amounts: transactions.get("invalid_amounts"),
            unknown_wallet_refs: unknown_refs,
            self_transfers: transactions.get("self_transfers"),
        })
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text so that ordering by
/// the column is chronological.
fn encode_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
