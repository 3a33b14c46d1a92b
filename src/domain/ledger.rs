use serde::Serialize;

use super::{format_cents, Cents};

/// Raw counters gathered from the store for integrity verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityStats {
    pub wallet_count: i64,
    pub transaction_count: i64,
    pub total_balance: Cents,
    pub negative_balances: i64,
    pub invalid_amounts: i64,
    pub unknown_wallet_refs: i64,
    pub self_transfers: i64,
}

/// Result of an integrity check over the whole ledger.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub wallet_count: i64,
    pub transaction_count: i64,
    /// Sum of all wallet balances; transfers never change it
    pub total_balance: Cents,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Turn store counters into a report listing every violated invariant.
pub fn build_integrity_report(stats: &IntegrityStats) -> IntegrityReport {
    let mut issues = Vec::new();

    if stats.negative_balances > 0 {
        issues.push(format!(
            "{} wallet(s) have a negative balance",
            stats.negative_balances
        ));
    }
    if stats.total_balance < 0 {
        issues.push(format!(
            "total balance is negative: {}",
            format_cents(stats.total_balance)
        ));
    }
    if stats.invalid_amounts > 0 {
        issues.push(format!(
            "{} transaction(s) have a non-positive amount",
            stats.invalid_amounts
        ));
    }
    if stats.unknown_wallet_refs > 0 {
        issues.push(format!(
            "{} transaction(s) reference unknown wallets",
            stats.unknown_wallet_refs
        ));
    }
    if stats.self_transfers > 0 {
        issues.push(format!(
            "{} transaction(s) move money from a wallet to itself",
            stats.self_transfers
        ));
    }

    IntegrityReport {
        wallet_count: stats.wallet_count,
        transaction_count: stats.transaction_count,
        total_balance: stats.total_balance,
        issues,
    }
}
