use thiserror::Error;

use crate::domain::Cents;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sender wallet not found: {0}")]
    SenderNotFound(String),

    #[error("Recipient wallet not found: {0}")]
    RecipientNotFound(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from a wallet to itself")]
    SelfTransfer,

    /// The message leaves out `balance`: HTTP clients see it verbatim.
    #[error("Insufficient funds in wallet {address}: required {required} cents")]
    InsufficientFunds {
        address: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid limit: {0} (must be a positive integer)")]
    InvalidLimit(i64),

    #[error("Storage failure: {0:#}")]
    StorageFailure(#[from] anyhow::Error),
}
