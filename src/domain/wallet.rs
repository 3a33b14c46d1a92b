use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Cents;

/// Number of random bytes behind a wallet address.
/// Hex-encoded, an address is twice as many characters long.
pub const ADDRESS_BYTES: usize = 32;

/// Number of wallets created on first boot.
pub const DEFAULT_WALLET_COUNT: usize = 10;

/// Starting balance of every wallet created on first boot (100.00).
pub const DEFAULT_INITIAL_BALANCE: Cents = 10_000;

/// A wallet holds a balance under an opaque, unique address.
/// Wallets are created in bulk on first boot and only mutated by transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    /// Balance in cents, never negative
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(address: impl Into<String>, balance: Cents) -> Self {
        Self {
            address: address.into(),
            balance,
            created_at: Utc::now(),
        }
    }

    /// Create a wallet under a freshly generated random address.
    pub fn generate(balance: Cents) -> Self {
        Self::new(generate_address(), balance)
    }
}

/// Generate a random wallet address: 32 random bytes, hex-encoded.
pub fn generate_address() -> String {
    let mut bytes = [0u8; ADDRESS_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
