// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use remitto::application::{LedgerService, SetupOutcome};
use remitto::domain::Cents;
use remitto::storage::StoreOptions;
use tempfile::TempDir;

/// URL of the test database inside `temp_dir`
pub fn database_url(temp_dir: &TempDir) -> String {
    format!("sqlite:{}", temp_dir.path().join("test.db").display())
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&database_url(&temp_dir), &StoreOptions::default()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: a ledger seeded with wallets
pub struct Seeded {
    pub service: LedgerService,
    pub addresses: Vec<String>,
    _temp: TempDir,
}

impl Seeded {
    /// Create `count` wallets holding `balance` cents each
    pub async fn with_wallets(count: usize, balance: Cents) -> Result<Self> {
        let (service, temp) = test_service().await?;
        let addresses = match service.initial_setup(count, balance).await? {
            SetupOutcome::Created(wallets) => wallets.into_iter().map(|w| w.address).collect(),
            SetupOutcome::AlreadyInitialized { .. } => anyhow::bail!("fresh database had wallets"),
        };
        Ok(Self {
            service,
            addresses,
            _temp: temp,
        })
    }

    /// Two wallets, 100.00 each
    pub async fn pair() -> Result<Self> {
        Self::with_wallets(2, 10_000).await
    }

    pub fn a(&self) -> &str {
        &self.addresses[0]
    }

    pub fn b(&self) -> &str {
        &self.addresses[1]
    }

    pub async fn balance(&self, address: &str) -> Result<Cents> {
        Ok(self.service.get_balance(address).await?)
    }

    pub fn url(&self) -> String {
        database_url(&self._temp)
    }

    pub async fn transaction_count(&self) -> Result<usize> {
        Ok(self.service.list_all_transactions().await?.len())
    }
}
