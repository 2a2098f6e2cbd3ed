use thiserror::Error;

/// Errors shared across pipeline stages at the boundaries where a lower
/// layer's failure is always fatal to its caller. Per-row and per-file
/// problems are carried as data on result structs, not as `CoreError`
/// values — see SPEC_FULL.md §4.0.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("currency code must be 3 uppercase ASCII letters, got {0:?}")]
    InvalidCurrency(String),

    #[error("amount overflowed during arithmetic")]
    AmountOverflow,

    #[error("transaction index {0} is not unique within this session")]
    DuplicateTransactionIndex(u64),
}
