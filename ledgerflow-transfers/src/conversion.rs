//! Intra-bank currency-conversion pairing (spec §4.8.2). Grounded
//! verbatim on
//! `examples/original_source/backend/transfer_detection/currency_converter.py`'s
//! `match_currency_conversions`/`is_matching_conversion`/
//! `calculate_conversion_confidence`.

use std::collections::HashSet;

use ledgerflow_core::Transaction;

use crate::candidate::ConversionInfo;
use crate::candidate::extract_conversion_info;
use crate::error::TransferError;

const AMOUNT_EPSILON: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ConversionPair {
    pub outgoing_index: u64,
    pub incoming_index: u64,
    pub amount: f64,
    pub exchange_amount: f64,
    pub confidence: f64,
    pub pair_id: String,
}

struct Candidate<'a> {
    transaction: &'a Transaction,
    info: ConversionInfo,
}

/// Matches candidates whose descriptions parse as `Converted X to Y` and
/// whose (amount, date, sign) agree. Returns committed pairs plus the set
/// of transaction indices they consume — cross-bank pairing (§4.8.3)
/// never sees these again.
pub fn match_currency_conversions(
    transactions: &[Transaction],
    date_tolerance_hours: i64,
) -> Result<(Vec<ConversionPair>, HashSet<u64>), TransferError> {
    let mut candidates = Vec::new();
    for transaction in transactions {
        if let Some(info) = extract_conversion_info(&transaction.description)? {
            candidates.push(Candidate { transaction, info });
        }
    }

    let mut matched = HashSet::new();
    let mut pairs = Vec::new();

    for i in 0..candidates.len() {
        if matched.contains(&candidates[i].transaction.transaction_index) {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if matched.contains(&candidates[j].transaction.transaction_index) {
                continue;
            }
            if !is_matching_conversion(&candidates[i], &candidates[j], date_tolerance_hours) {
                continue;
            }

            let (outgoing, incoming) = match (candidates[i].transaction.amount, candidates[j].transaction.amount) {
                (o, inc) if o < 0.0 && inc > 0.0 => (&candidates[i], &candidates[j]),
                (o, inc) if o > 0.0 && inc < 0.0 => (&candidates[j], &candidates[i]),
                _ => continue,
            };

            let confidence = calculate_conversion_confidence(outgoing, incoming);
            let pair_id = format!("conversion_{}", pairs.len());
            pairs.push(ConversionPair {
                outgoing_index: outgoing.transaction.transaction_index,
                incoming_index: incoming.transaction.transaction_index,
                amount: outgoing.transaction.amount.abs(),
                exchange_amount: incoming.transaction.amount.abs(),
                confidence,
                pair_id,
            });
            matched.insert(outgoing.transaction.transaction_index);
            matched.insert(incoming.transaction.transaction_index);
            break;
        }
    }

    Ok((pairs, matched))
}

fn is_matching_conversion(a: &Candidate<'_>, b: &Candidate<'_>, date_tolerance_hours: i64) -> bool {
    let amounts_match = (a.info.from_amount - b.info.from_amount).abs() < AMOUNT_EPSILON
        && (a.info.to_amount - b.info.to_amount).abs() < AMOUNT_EPSILON
        && a.info.from_currency == b.info.from_currency
        && a.info.to_currency == b.info.to_currency;

    let date_match = dates_within_tolerance(a.transaction, b.transaction, date_tolerance_hours);
    let opposite_signs = (a.transaction.amount * b.transaction.amount) < 0.0;

    let a_matches = (a.transaction.amount.abs() - a.info.from_amount).abs() < AMOUNT_EPSILON
        || (a.transaction.amount.abs() - a.info.to_amount).abs() < AMOUNT_EPSILON;
    let b_matches = (b.transaction.amount.abs() - b.info.from_amount).abs() < AMOUNT_EPSILON
        || (b.transaction.amount.abs() - b.info.to_amount).abs() < AMOUNT_EPSILON;

    amounts_match && date_match && opposite_signs && a_matches && b_matches
}

pub(crate) fn dates_within_tolerance(a: &Transaction, b: &Transaction, tolerance_hours: i64) -> bool {
    let delta_hours = (a.date - b.date).num_hours().abs();
    delta_hours <= tolerance_hours
}

fn calculate_conversion_confidence(outgoing: &Candidate<'_>, incoming: &Candidate<'_>) -> f64 {
    let mut confidence = 0.5;

    let tight_match = (outgoing.transaction.amount.abs() - outgoing.info.from_amount).abs() < AMOUNT_EPSILON
        && (incoming.transaction.amount.abs() - outgoing.info.to_amount).abs() < AMOUNT_EPSILON;
    if tight_match {
        confidence += 0.3;
    }

    if outgoing.transaction.date == incoming.transaction.date {
        confidence += 0.2;
    }

    let outgoing_mentions_converted = outgoing.transaction.description.to_lowercase().contains("converted");
    let incoming_mentions_converted = incoming.transaction.description.to_lowercase().contains("converted");
    if outgoing_mentions_converted && incoming_mentions_converted {
        confidence += 0.2;
    }

    if outgoing.info == incoming.info {
        confidence += 0.1;
    }

    confidence.min(1.0)
}
