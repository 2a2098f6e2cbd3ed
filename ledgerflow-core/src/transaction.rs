use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::error::CoreError;

/// A normalized row conforming to the canonical schema (spec §3).
///
/// Created during normalization, mutated only by cleaning, categorization,
/// and transfer-detection stages (in that order), and immutable once
/// emitted to the output ledger.
///
/// Field layout and the `raw` side-map are grounded on
/// `codex-bank-ingest::NormalizedBankTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Signed amount; negative = outflow, positive = inflow.
    pub amount: f64,
    /// ISO-4217 3-letter uppercase code.
    pub currency: String,
    pub description: String,
    pub note: Option<String>,
    /// Blank until categorization runs.
    pub category: String,
    pub account: String,
    pub balance: Option<f64>,
    /// Lower-case bank identifier.
    pub source_bank: String,
    /// Stable integer assigned at ingestion; unique within a session.
    pub transaction_index: u64,
    pub exchange_amount: Option<f64>,
    pub exchange_currency: Option<String>,
    /// Original source fields, preserved for audit / fallback lookups.
    pub raw: BTreeMap<String, String>,
}

impl Transaction {
    /// Validates the universal invariants from spec §3 / §8 that hold for
    /// every canonical row regardless of pipeline stage.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !is_valid_currency(&self.currency) {
            return Err(CoreError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }

    /// Whether this transaction already carries a transfer-pair tag in its
    /// note (spec §8: `category == "Balance Correction"` rows must contain
    /// `"Transfer "` and a pair id in `note`).
    pub fn has_transfer_tag(&self) -> bool {
        self.note
            .as_deref()
            .is_some_and(|note| note.contains("Transfer "))
    }

    /// Content checksum over the fields that determine row identity,
    /// independent of `transaction_index` — used to detect duplicate rows
    /// re-ingested from overlapping exports.
    pub fn content_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.amount.to_bits().to_be_bytes());
        hasher.update(b"|");
        hasher.update(self.currency.as_bytes());
        hasher.update(b"|");
        hasher.update(self.description.as_bytes());
        hasher.update(b"|");
        hasher.update(self.source_bank.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// 3-letter uppercase ASCII currency code check (spec §3, §8).
pub fn is_valid_currency(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Ensures every `transaction_index` in the slice is unique, per the
/// session-wide invariant in spec §3.
pub fn ensure_unique_indices(transactions: &[Transaction]) -> Result<(), CoreError> {
    let mut seen = std::collections::HashSet::new();
    for txn in transactions {
        if !seen.insert(txn.transaction_index) {
            return Err(CoreError::DuplicateTransactionIndex(txn.transaction_index));
        }
    }
    Ok(())
}
