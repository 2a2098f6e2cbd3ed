use thiserror::Error;

/// Errors fatal to a transfer-detection run. Per-pair ambiguity (conflicts,
/// unmatched candidates) is data carried on [`crate::TransferOutcome`], not
/// a `TransferError` — the engine never fails the batch over an
/// individual candidate (spec §7: "Transfer detection never fails the
/// batch; on internal exception it logs and emits an empty list").
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid candidate-matching pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("manual pair references unknown transaction index {0}")]
    UnknownTransactionIndex(u64),

    #[error("manual pair references the same transaction index twice: {0}")]
    SelfPairedTransaction(u64),
}
