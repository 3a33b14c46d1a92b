// Application layer: the ledger service and its error type.
// Every client (HTTP API, CLI) goes through `LedgerService`.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
