//! Pipeline telemetry counters, persisted as JSON with corrupt-file
//! recovery. Grounded verbatim on
//! `codex-accounting-api::telemetry::AccountingTelemetry` (store/inner
//! split, `Mutex`-guarded counters, warn-and-continue on a corrupt
//! persisted file), counters renamed to this pipeline's stages
//! (SPEC_FULL.md §4.0.3).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use ledgerflow_transfers::TransferOutcome;
use ledgerflow_transfers::TransferType;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::pipeline::FileParseResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub files_processed: usize,
    pub files_failed: usize,
    pub rows_ingested: usize,
    pub rows_dropped: usize,
    pub banks_detected: usize,
    pub banks_undetected: usize,
    pub transfer_pairs_exchange: usize,
    pub transfer_pairs_traditional: usize,
    pub transfer_pairs_flexible: usize,
    pub transfer_pairs_conversion: usize,
    pub transfer_pairs_manual: usize,
    pub conflicts: usize,
    pub flagged_for_review: usize,
}

#[derive(Debug)]
struct TelemetryStore {
    path: PathBuf,
}

impl TelemetryStore {
    fn read(&self) -> anyhow::Result<Option<TelemetryCounters>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))?;
        let counters = serde_json::from_slice(&data).with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(counters))
    }

    fn persist(&self, counters: &TelemetryCounters) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(counters).context("failed to encode telemetry counters")?;
        fs::write(&self.path, data).with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TelemetryInner {
    counters: TelemetryCounters,
    store: Option<TelemetryStore>,
}

/// Clonable handle to a process-wide telemetry counter set, optionally
/// persisted to `<config_dir>/telemetry.json`.
#[derive(Clone, Default)]
pub struct PipelineTelemetry {
    inner: Arc<Mutex<TelemetryInner>>,
}

impl PipelineTelemetry {
    /// Loads persisted counters from `path`, if any; a corrupt or missing
    /// file falls back to zeroed counters rather than failing startup.
    #[must_use]
    pub fn load(path: Option<PathBuf>) -> Self {
        let store = path.map(|path| TelemetryStore { path });
        let counters = match &store {
            Some(store) => match store.read() {
                Ok(Some(existing)) => existing,
                Ok(None) => TelemetryCounters::default(),
                Err(err) => {
                    warn!(path = %store.path.display(), error = %err, "failed to load persisted telemetry; continuing with defaults");
                    TelemetryCounters::default()
                }
            },
            None => TelemetryCounters::default(),
        };
        Self {
            inner: Arc::new(Mutex::new(TelemetryInner { counters, store })),
        }
    }

    #[must_use]
    pub fn counters(&self) -> TelemetryCounters {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).counters.clone()
    }

    /// Folds one `transform` batch's results into the running counters and
    /// persists them if a store is configured.
    pub fn record_batch(&self, files: &[FileParseResult], outcome: &TransferOutcome) {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        for file in files {
            if file.success {
                guard.counters.files_processed += 1;
                guard.counters.rows_ingested += file.row_count;
                if let Some(summary) = &file.cleaning_summary {
                    guard.counters.rows_dropped += summary.rows_dropped;
                }
                if file.bank_info.detected.is_some() {
                    guard.counters.banks_detected += 1;
                } else {
                    guard.counters.banks_undetected += 1;
                }
            } else {
                guard.counters.files_failed += 1;
            }
        }

        for pair in &outcome.pairs {
            match pair.transfer_type {
                TransferType::CrossBankExchange => guard.counters.transfer_pairs_exchange += 1,
                TransferType::CrossBankTraditional => guard.counters.transfer_pairs_traditional += 1,
                TransferType::CrossBankFlexible => guard.counters.transfer_pairs_flexible += 1,
                TransferType::CurrencyConversion => guard.counters.transfer_pairs_conversion += 1,
                TransferType::Manual => guard.counters.transfer_pairs_manual += 1,
            }
        }
        guard.counters.conflicts += outcome.conflicts.len();
        guard.counters.flagged_for_review += outcome.flagged_for_review.len();

        if let Some(store) = &guard.store
            && let Err(err) = store.persist(&guard.counters)
        {
            warn!(path = %store.path.display(), error = %err, "failed to persist telemetry counters");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerflow_transfers::TransferSummary;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn outcome_with(pairs: Vec<ledgerflow_transfers::CommittedPair>) -> TransferOutcome {
        TransferOutcome {
            transactions: Vec::new(),
            pairs,
            potential_transfers: Vec::new(),
            conflicts: Vec::new(),
            flagged_for_review: Vec::new(),
            summary: TransferSummary::default(),
        }
    }

    #[test]
    fn counters_start_at_zero_with_no_store() {
        let telemetry = PipelineTelemetry::load(None);
        assert_eq!(telemetry.counters().files_processed, 0);
    }

    #[test]
    fn record_batch_persists_and_reloads() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("telemetry.json");

        let telemetry = PipelineTelemetry::load(Some(path.clone()));
        telemetry.record_batch(&[], &outcome_with(Vec::new()));
        assert!(path.exists());

        let reloaded = PipelineTelemetry::load(Some(path));
        assert_eq!(reloaded.counters().files_processed, 0);
    }

    #[test]
    fn corrupt_telemetry_file_falls_back_to_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("telemetry.json");
        fs::write(&path, b"not json").expect("write garbage");

        let telemetry = PipelineTelemetry::load(Some(path));
        assert_eq!(telemetry.counters().files_processed, 0);
    }
}
