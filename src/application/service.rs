use anyhow::Context;

use crate::domain::{build_integrity_report, Cents, IntegrityReport, Transaction, Wallet};
use crate::storage::{Repository, StoreOptions};

use super::AppError;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (HTTP API, CLI).
pub struct LedgerService {
    repo: Repository,
}

/// Result of the first-boot wallet setup
#[derive(Debug)]
pub enum SetupOutcome {
    /// The store was empty and these wallets were created
    Created(Vec<Wallet>),
    /// Wallets already existed; nothing was changed
    AlreadyInitialized { wallet_count: i64 },
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Connect to the database and bring its schema up to date.
    pub async fn init(database_url: &str, options: &StoreOptions) -> Result<Self, AppError> {
        let repo = Repository::init(database_url, options).await?;
        Ok(Self::new(repo))
    }

    /// Create `count` wallets holding `balance` each, unless wallets already
    /// exist. All of them are written in one transaction or none is.
    pub async fn initial_setup(
        &self,
        count: usize,
        balance: Cents,
    ) -> Result<SetupOutcome, AppError> {
        if balance < 0 {
            return Err(AppError::InvalidAmount(
                "Initial balance cannot be negative".to_string(),
            ));
        }

        // The count and the inserts share one write transaction, so two
        // processes booting on an empty file cannot both seed it.
        let mut tx = self.repo.begin().await?;

        let wallet_count = Repository::lock_wallets(&mut tx).await?;
        if wallet_count > 0 {
            tracing::info!(wallet_count, "wallets already exist, skipping setup");
            return Ok(SetupOutcome::AlreadyInitialized { wallet_count });
        }

        let wallets: Vec<Wallet> = (0..count).map(|_| Wallet::generate(balance)).collect();
        Repository::insert_wallets(&mut tx, &wallets).await?;
        tx.commit().await.context("Failed to commit initial wallets")?;

        tracing::info!(count, balance, "created initial wallets");
        Ok(SetupOutcome::Created(wallets))
    }

    // ========================
    // Wallet operations
    // ========================

    /// Get the balance of a wallet, in cents.
    pub async fn get_balance(&self, address: &str) -> Result<Cents, AppError> {
        self.repo
            .get_wallet(address)
            .await?
            .map(|wallet| wallet.balance)
            .ok_or_else(|| AppError::WalletNotFound(address.to_string()))
    }

    /// List all wallets.
    pub async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        Ok(self.repo.list_wallets().await?)
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move `amount_cents` from one wallet to another.
    ///
    /// Checks run in a fixed order: sender exists, recipient exists, amount
    /// is positive, wallets differ, sender can cover the amount. Both wallet
    /// rows are locked before any balance is read, and the debit, the credit
    /// and the ledger entry are committed together or not at all.
    pub async fn transfer(
        &self,
        from_address: &str,
        to_address: &str,
        amount_cents: Cents,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.repo.begin().await?;

        let sender_balance = Repository::lock_wallet(&mut tx, from_address)
            .await?
            .ok_or_else(|| AppError::SenderNotFound(from_address.to_string()))?;

        if Repository::lock_wallet(&mut tx, to_address).await?.is_none() {
            return Err(AppError::RecipientNotFound(to_address.to_string()));
        }

        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        if from_address == to_address {
            return Err(AppError::SelfTransfer);
        }

        if sender_balance < amount_cents {
            tracing::info!(
                from = from_address,
                balance = sender_balance,
                amount_cents,
                "transfer rejected: insufficient funds"
            );
            return Err(AppError::InsufficientFunds {
                address: from_address.to_string(),
                balance: sender_balance,
                required: amount_cents,
            });
        }

        let transaction = Transaction::new(from_address, to_address, amount_cents);

        Repository::adjust_balance(&mut tx, from_address, -amount_cents).await?;
        Repository::adjust_balance(&mut tx, to_address, amount_cents).await?;
        Repository::save_transaction(&mut tx, &transaction).await?;

        tx.commit().await.context("Failed to commit transfer")?;

        tracing::info!(
            id = %transaction.id,
            from = from_address,
            to = to_address,
            amount_cents,
            "transfer committed"
        );
        Ok(transaction)
    }

    /// List at most `limit` transactions, newest first.
    pub async fn list_recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>, AppError> {
        if limit <= 0 {
            return Err(AppError::InvalidLimit(limit));
        }
        Ok(self.repo.list_recent_transactions(limit).await?)
    }

    /// List the whole transaction log, oldest first.
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        Ok(build_integrity_report(&stats))
    }
}
