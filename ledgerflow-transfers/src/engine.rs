//! Transfer-detection orchestrator (spec §4.8 end to end). Runs candidate
//! identification, currency-conversion pairing, cross-bank pairing,
//! manual-pair interleaving, categorization of committed pairs, and
//! review-flagging, producing the `{transfer_pairs, potential_transfers,
//! conflicts, flagged_for_review, summary}` shape in spec §6.

use std::collections::HashSet;

use chrono::NaiveDate;
use ledgerflow_core::AppConfig;
use ledgerflow_core::Transaction;

use crate::candidate::is_candidate;
use crate::conversion::match_currency_conversions;
use crate::crossbank::CrossBankConflict;
use crate::crossbank::MatchStrategy;
use crate::crossbank::match_cross_bank;
use crate::error::TransferError;
use crate::flagged::is_large_unmatched_candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    CrossBankExchange,
    CrossBankTraditional,
    CrossBankFlexible,
    CurrencyConversion,
    /// A caller-confirmed pair supplied to `detect_transfers` rather than
    /// discovered by a matching strategy. Not one of the four types in
    /// spec §6's schema, added because §6's `transform` signature accepts
    /// `manual_pairs?` and those pairs need a representable type too — see
    /// DESIGN.md's Open Question log.
    Manual,
}

impl TransferType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferType::CrossBankExchange => "cross_bank_exchange",
            TransferType::CrossBankTraditional => "cross_bank_traditional",
            TransferType::CrossBankFlexible => "cross_bank_flexible",
            TransferType::CurrencyConversion => "currency_conversion",
            TransferType::Manual => "manual",
        }
    }
}

/// A user-confirmed (outgoing, incoming) pair supplied to `detect_transfers`
/// ahead of auto-detection (spec §6 `transform`'s `manual_pairs?`).
#[derive(Debug, Clone, Copy)]
pub struct ManualPair {
    pub outgoing_index: u64,
    pub incoming_index: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CommittedPair {
    pub outgoing_index: u64,
    pub incoming_index: u64,
    pub amount: f64,
    pub matched_amount: f64,
    pub exchange_amount: Option<f64>,
    pub date: NaiveDate,
    pub confidence: f64,
    pub pair_id: String,
    pub transfer_type: TransferType,
    pub match_strategy: Option<MatchStrategy>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TransferSummary {
    pub total_transactions: usize,
    pub transfer_pairs_found: usize,
    pub currency_conversions: usize,
    pub cross_bank_transfers: usize,
    pub potential_transfers: usize,
    pub conflicts: usize,
    pub flagged_for_review: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferOutcome {
    /// Input transactions with `category`/`note` updated for every
    /// committed pair (spec §4.8.6); all other rows are returned
    /// unchanged.
    pub transactions: Vec<Transaction>,
    pub pairs: Vec<CommittedPair>,
    /// Every transaction whose description matched a §4.8.1 candidate
    /// pattern, whether or not it ended up paired.
    pub potential_transfers: Vec<u64>,
    pub conflicts: Vec<CrossBankConflict>,
    pub flagged_for_review: Vec<u64>,
    pub summary: TransferSummary,
}

/// Runs the full transfer-detection pipeline over `transactions`.
pub fn detect_transfers(
    transactions: &[Transaction],
    config: &AppConfig,
    manual_pairs: &[ManualPair],
) -> Result<TransferOutcome, TransferError> {
    let index_of = |index: u64| transactions.iter().position(|t| t.transaction_index == index);

    let mut matched_indices: HashSet<u64> = HashSet::new();
    let mut committed = Vec::new();

    for manual in manual_pairs {
        if manual.outgoing_index == manual.incoming_index {
            return Err(TransferError::SelfPairedTransaction(manual.outgoing_index));
        }
        let Some(out_pos) = index_of(manual.outgoing_index) else {
            return Err(TransferError::UnknownTransactionIndex(manual.outgoing_index));
        };
        let Some(in_pos) = index_of(manual.incoming_index) else {
            return Err(TransferError::UnknownTransactionIndex(manual.incoming_index));
        };

        let outgoing = &transactions[out_pos];
        let incoming = &transactions[in_pos];
        committed.push(CommittedPair {
            outgoing_index: outgoing.transaction_index,
            incoming_index: incoming.transaction_index,
            amount: outgoing.amount.abs(),
            matched_amount: incoming.amount,
            exchange_amount: outgoing.exchange_amount,
            date: outgoing.date,
            confidence: 1.0,
            pair_id: format!("manual_{}", committed.len()),
            transfer_type: TransferType::Manual,
            match_strategy: None,
        });
        matched_indices.insert(outgoing.transaction_index);
        matched_indices.insert(incoming.transaction_index);
    }

    let remaining: Vec<Transaction> = transactions
        .iter()
        .filter(|t| !matched_indices.contains(&t.transaction_index))
        .cloned()
        .collect();

    let (conversion_pairs, conversion_matched) = match_currency_conversions(&remaining, config.date_tolerance_hours)?;
    for pair in &conversion_pairs {
        let Some(outgoing) = transactions.iter().find(|t| t.transaction_index == pair.outgoing_index) else {
            continue;
        };
        committed.push(CommittedPair {
            outgoing_index: pair.outgoing_index,
            incoming_index: pair.incoming_index,
            amount: pair.amount,
            matched_amount: pair.exchange_amount,
            exchange_amount: Some(pair.exchange_amount),
            date: outgoing.date,
            confidence: pair.confidence,
            pair_id: pair.pair_id.clone(),
            transfer_type: TransferType::CurrencyConversion,
            match_strategy: None,
        });
    }
    matched_indices.extend(conversion_matched.iter().copied());

    let cross_bank_pool: Vec<Transaction> = transactions
        .iter()
        .filter(|t| !matched_indices.contains(&t.transaction_index))
        .cloned()
        .collect();
    let cross_bank_outcome = match_cross_bank(
        &cross_bank_pool,
        &HashSet::new(),
        &config.user_display_name,
        config.date_tolerance_hours,
        config.confidence_threshold,
    )?;
    for pair in &cross_bank_outcome.pairs {
        let Some(outgoing) = transactions.iter().find(|t| t.transaction_index == pair.outgoing_index) else {
            continue;
        };
        let Some(incoming) = transactions.iter().find(|t| t.transaction_index == pair.incoming_index) else {
            continue;
        };
        let transfer_type = match pair.strategy {
            MatchStrategy::ExchangeAmount => TransferType::CrossBankExchange,
            MatchStrategy::Traditional => TransferType::CrossBankTraditional,
            MatchStrategy::Flexible => TransferType::CrossBankFlexible,
        };
        committed.push(CommittedPair {
            outgoing_index: pair.outgoing_index,
            incoming_index: pair.incoming_index,
            amount: outgoing.amount.abs(),
            matched_amount: incoming.amount,
            exchange_amount: outgoing.exchange_amount,
            date: outgoing.date,
            confidence: pair.confidence,
            pair_id: pair.pair_id.clone(),
            transfer_type,
            match_strategy: Some(pair.strategy),
        });
        matched_indices.insert(pair.outgoing_index);
        matched_indices.insert(pair.incoming_index);
    }

    let mut potential_transfers = Vec::new();
    for transaction in transactions {
        if is_candidate(&transaction.description, &config.user_display_name)? {
            potential_transfers.push(transaction.transaction_index);
        }
    }

    let mut flagged_for_review = Vec::new();
    for transaction in transactions {
        if matched_indices.contains(&transaction.transaction_index) {
            continue;
        }
        let is_candidate_row = potential_transfers.contains(&transaction.transaction_index);
        if is_candidate_row {
            flagged_for_review.push(transaction.transaction_index);
        } else if is_large_unmatched_candidate(transaction.amount, &transaction.description) {
            flagged_for_review.push(transaction.transaction_index);
        }
    }

    let summary = TransferSummary {
        total_transactions: transactions.len(),
        transfer_pairs_found: committed.len(),
        currency_conversions: conversion_pairs.len(),
        cross_bank_transfers: cross_bank_outcome.pairs.len(),
        potential_transfers: potential_transfers.len(),
        conflicts: cross_bank_outcome.conflicts.len(),
        flagged_for_review: flagged_for_review.len(),
    };

    let transactions = apply_categorization(transactions, &committed, &config.default_transfer_category);

    Ok(TransferOutcome {
        transactions,
        pairs: committed,
        potential_transfers,
        conflicts: cross_bank_outcome.conflicts,
        flagged_for_review,
        summary,
    })
}

fn apply_categorization(transactions: &[Transaction], pairs: &[CommittedPair], default_category: &str) -> Vec<Transaction> {
    let mut rows = transactions.to_vec();

    for pair in pairs {
        let strategy_name = pair.match_strategy.map_or(pair.transfer_type.as_str(), MatchStrategy::as_str);
        for (index, direction) in [(pair.outgoing_index, "out"), (pair.incoming_index, "in")] {
            if let Some(row) = rows.iter_mut().find(|t| t.transaction_index == index) {
                row.category = default_category.to_string();
                let tag = format!("Transfer {direction} (Pair: {}, Strategy: {strategy_name})", pair.pair_id);
                row.note = Some(match row.note.take() {
                    Some(existing) if !existing.is_empty() => format!("{existing}; {tag}"),
                    _ => tag,
                });
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn txn(index: u64, bank: &str, amount: f64, currency: &str, description: &str, date: NaiveDate) -> Transaction {
        Transaction {
            date,
            amount,
            currency: currency.to_string(),
            description: description.to_string(),
            note: None,
            category: String::new(),
            account: "Checking".to_string(),
            balance: None,
            source_bank: bank.to_string(),
            transaction_index: index,
            exchange_amount: None,
            exchange_currency: None,
            raw: BTreeMap::new(),
        }
    }

    #[test]
    fn commits_conversion_pair_and_recategorizes_both_rows() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let transactions = vec![
            txn(0, "wise", -565.24, "USD", "Converted 565.24 USD to 200,000.00 HUF", date),
            txn(1, "wise", 200000.00, "HUF", "Converted 565.24 USD to 200,000.00 HUF", date),
        ];
        let config = AppConfig::default();

        let outcome = detect_transfers(&transactions, &config, &[]).unwrap();

        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].transfer_type, TransferType::CurrencyConversion);
        assert!(outcome.pairs[0].confidence >= 0.8);
        assert_eq!(outcome.transactions[0].category, config.default_transfer_category);
        assert_eq!(outcome.transactions[1].category, config.default_transfer_category);
        assert!(outcome.transactions[0].has_transfer_tag());
        assert!(outcome.transactions[1].has_transfer_tag());
    }

    #[test]
    fn manual_pair_is_committed_without_running_strategies() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let transactions = vec![
            txn(0, "wise", -200.0, "USD", "ATM Withdrawal", date),
            txn(1, "nayapay", 200.0, "USD", "Deposit", date),
        ];
        let config = AppConfig::default();
        let manual = vec![ManualPair {
            outgoing_index: 0,
            incoming_index: 1,
        }];

        let outcome = detect_transfers(&transactions, &config, &manual).unwrap();

        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].transfer_type, TransferType::Manual);
    }

    #[test]
    fn unknown_manual_pair_index_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let transactions = vec![txn(0, "wise", -200.0, "USD", "ATM Withdrawal", date)];
        let config = AppConfig::default();
        let manual = vec![ManualPair {
            outgoing_index: 0,
            incoming_index: 99,
        }];

        assert!(detect_transfers(&transactions, &config, &manual).is_err());
    }

    #[test]
    fn unmatched_candidate_is_flagged_for_review() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let transactions = vec![txn(0, "wise", -300.0, "USD", "Transfer to Unknown Recipient", date)];
        let config = AppConfig::default();

        let outcome = detect_transfers(&transactions, &config, &[]).unwrap();

        assert_eq!(outcome.pairs.len(), 0);
        assert_eq!(outcome.flagged_for_review, vec![0]);
        assert_eq!(outcome.potential_transfers, vec![0]);
    }
}
