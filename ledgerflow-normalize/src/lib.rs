//! Data cleaning, categorization, and account resolution (spec §4.7).
//!
//! Turns raw header-keyed records produced by `ledgerflow-ingest` into
//! canonical [`ledgerflow_core::Transaction`] rows, using a bank's
//! [`ledgerflow_bankconfig::BankConfig`] where one was detected.

mod account;
mod categorize;
mod cleaning;
mod columns;
mod dates;
mod error;
mod numeric;
mod normalize;

pub use account::resolve_account;
pub use categorize::categorize;
pub use cleaning::apply_conditional_overrides;
pub use cleaning::apply_description_cleaning;
pub use columns::resolve_exchange_amount;
pub use columns::resolve_exchange_currency;
pub use columns::updated_column_mapping;
pub use dates::parse_date;
pub use error::NormalizeError;
pub use normalize::normalize;
pub use normalize::NormalizeOutcome;
pub use numeric::parse_amount;
pub use numeric::parse_amount_with;
