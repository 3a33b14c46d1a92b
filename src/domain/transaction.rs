use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type TransactionId = Uuid;

/// A ledger entry recording one completed transfer between two wallets.
/// Entries are append-only and never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Sender address (balance decreases)
    pub from_address: String,
    /// Recipient address (balance increases)
    pub to_address: String,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a new ledger entry, stamping a fresh id and the current time.
    pub fn new(
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount_cents: Cents,
    ) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount_cents,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_is_stamped() {
        let before = Utc::now();
        let tx = Transaction::new("alice", "bob", 5000);

        assert_eq!(tx.from_address, "alice");
        assert_eq!(tx.to_address, "bob");
        assert_eq!(tx.amount_cents, 5000);
        assert!(tx.timestamp >= before);
        assert_eq!(tx.id.get_version_num(), 4);
    }

    #[test]
    fn test_each_transaction_gets_its_own_id() {
        let a = Transaction::new("alice", "bob", 1);
        let b = Transaction::new("alice", "bob", 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        Transaction::new("alice", "bob", 0);
    }
}
