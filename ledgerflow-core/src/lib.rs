//! Shared canonical data model used by every `ledgerflow` pipeline stage.

mod config;
mod error;
mod transaction;

pub use config::AppConfig;
pub use error::CoreError;
pub use transaction::Transaction;
pub use transaction::ensure_unique_indices;
pub use transaction::is_valid_currency;
