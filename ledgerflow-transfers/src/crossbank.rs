//! Cross-bank pairing (spec §4.8.3–§4.8.4). Grounded on the general shape
//! of
//! `examples/original_source/backend/transfer_detection/cross_bank_matcher.py`'s
//! `_find_best_match`/`_evaluate_matching_strategies` (best-confidence-
//! per-outgoing selection, commit-only-above-threshold), but with the
//! user gate generalized to a single configured display name instead of
//! the original's hardcoded bank/person names.

use std::collections::HashSet;

use ledgerflow_core::Transaction;

use crate::conversion::dates_within_tolerance;
use crate::error::TransferError;

const AMOUNT_EPSILON: f64 = 0.01;
const CONFLICT_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExchangeAmount,
    Traditional,
    Flexible,
}

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::ExchangeAmount => "exchange_amount",
            MatchStrategy::Traditional => "traditional",
            MatchStrategy::Flexible => "flexible",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossBankPair {
    pub outgoing_index: u64,
    pub incoming_index: u64,
    pub confidence: f64,
    pub strategy: MatchStrategy,
    pub pair_id: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CrossBankConflict {
    pub outgoing_index: u64,
    pub incoming_indices: Vec<u64>,
    pub confidence: f64,
}

#[derive(Debug, Default)]
pub struct CrossBankOutcome {
    pub pairs: Vec<CrossBankPair>,
    pub conflicts: Vec<CrossBankConflict>,
}

struct Evaluation {
    incoming_index: usize,
    strategy: MatchStrategy,
    confidence: f64,
}

/// Pairs remaining unmatched candidates across banks. `already_matched`
/// holds indices consumed by currency-conversion pairing; those rows
/// never enter this stage.
pub fn match_cross_bank(
    transactions: &[Transaction],
    already_matched: &HashSet<u64>,
    user_name: &str,
    date_tolerance_hours: i64,
    confidence_threshold: f64,
) -> Result<CrossBankOutcome, TransferError> {
    let mut matched: HashSet<u64> = already_matched.clone();
    let mut outcome = CrossBankOutcome::default();

    let outgoing_indices: Vec<usize> = transactions
        .iter()
        .enumerate()
        .filter(|(_, t)| t.amount < 0.0 && !already_matched.contains(&t.transaction_index))
        .map(|(i, _)| i)
        .collect();

    for &oi in &outgoing_indices {
        if matched.contains(&transactions[oi].transaction_index) {
            continue;
        }
        let outgoing = &transactions[oi];

        let mut evaluations = Vec::new();
        for (ii, incoming) in transactions.iter().enumerate() {
            if incoming.amount <= 0.0 || matched.contains(&incoming.transaction_index) {
                continue;
            }
            if incoming.source_bank == outgoing.source_bank {
                continue;
            }
            if !dates_within_tolerance(outgoing, incoming, date_tolerance_hours) {
                continue;
            }
            if !name_gate_passes(&outgoing.description, &incoming.description, user_name)? {
                continue;
            }

            if let Some(eval) = best_strategy_for_pair(outgoing, incoming, user_name)? {
                evaluations.push(Evaluation {
                    incoming_index: ii,
                    strategy: eval.0,
                    confidence: eval.1,
                });
            }
        }

        if evaluations.is_empty() {
            continue;
        }

        let best_confidence = evaluations.iter().map(|e| e.confidence).fold(f64::MIN, f64::max);
        let top: Vec<&Evaluation> = evaluations
            .iter()
            .filter(|e| (e.confidence - best_confidence).abs() <= CONFLICT_EPSILON)
            .collect();

        if best_confidence < confidence_threshold {
            continue;
        }

        if top.len() > 1 {
            outcome.conflicts.push(CrossBankConflict {
                outgoing_index: outgoing.transaction_index,
                incoming_indices: top.iter().map(|e| transactions[e.incoming_index].transaction_index).collect(),
                confidence: best_confidence,
            });
            continue;
        }

        let winner = top[0];
        let incoming = &transactions[winner.incoming_index];
        let pair_id = format!("crossbank_{}", outcome.pairs.len());
        outcome.pairs.push(CrossBankPair {
            outgoing_index: outgoing.transaction_index,
            incoming_index: incoming.transaction_index,
            confidence: winner.confidence,
            strategy: winner.strategy,
            pair_id,
        });
        matched.insert(outgoing.transaction_index);
        matched.insert(incoming.transaction_index);
    }

    Ok(outcome)
}

fn best_strategy_for_pair(
    outgoing: &Transaction,
    incoming: &Transaction,
    user_name: &str,
) -> Result<Option<(MatchStrategy, f64)>, TransferError> {
    let same_day = outgoing.date == incoming.date;
    let both_mention_user = mentions_user(&outgoing.description, user_name) && mentions_user(&incoming.description, user_name);

    let mut best: Option<(MatchStrategy, f64)> = None;
    let mut consider = |strategy: MatchStrategy, confidence: f64| {
        if best.is_none_or(|(_, existing)| confidence > existing) {
            best = Some((strategy, confidence));
        }
    };

    if let (Some(exchange_amount), Some(exchange_currency)) = (outgoing.exchange_amount, &outgoing.exchange_currency)
        && incoming.currency.eq_ignore_ascii_case(exchange_currency)
        && (exchange_amount - incoming.amount).abs() <= AMOUNT_EPSILON
    {
        consider(
            MatchStrategy::ExchangeAmount,
            cross_bank_confidence(true, same_day, both_mention_user),
        );
    }

    if (outgoing.amount.abs() - incoming.amount).abs() <= AMOUNT_EPSILON {
        consider(MatchStrategy::Traditional, cross_bank_confidence(false, same_day, both_mention_user));
    }

    if both_mention_user {
        let larger = outgoing.amount.abs().max(incoming.amount);
        let smaller = outgoing.amount.abs().min(incoming.amount);
        let percent_diff = if larger <= 0.0 { 100.0 } else { (larger - smaller) / larger * 100.0 };
        if percent_diff < 100.0 {
            let confidence = cross_bank_confidence(false, same_day, both_mention_user).max(0.7);
            consider(MatchStrategy::Flexible, confidence);
        }
    }

    Ok(best)
}

fn cross_bank_confidence(is_exchange_match: bool, same_day: bool, both_mention_user: bool) -> f64 {
    let mut confidence = 0.5 + 0.2; // cross-bank is always true at this call site
    if is_exchange_match {
        confidence += 0.3;
    }
    if same_day {
        confidence += 0.2;
    }
    if both_mention_user {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

fn mentions_user(description: &str, user_name: &str) -> bool {
    let trimmed = user_name.trim();
    !trimmed.is_empty() && description.to_lowercase().contains(&trimmed.to_lowercase())
}

fn name_gate_passes(outgoing_desc: &str, incoming_desc: &str, user_name: &str) -> Result<bool, TransferError> {
    let trimmed = user_name.trim();
    if trimmed.is_empty() {
        return Ok(true);
    }

    let escaped = regex::escape(trimmed);
    let sent_to = build(&format!(r"sent\s+(?:money\s+)?to\s+{escaped}"))?;
    let transfer_from = build(&format!(r"transfer\s+from\s+{escaped}"))?;
    let incoming_fund_transfer_from = build(&format!(r"incoming\s+fund\s+transfer\s+from\s+{escaped}"))?;

    let forward =
        sent_to.is_match(outgoing_desc) && (transfer_from.is_match(incoming_desc) || incoming_fund_transfer_from.is_match(incoming_desc));
    let reverse =
        sent_to.is_match(incoming_desc) && (transfer_from.is_match(outgoing_desc) || incoming_fund_transfer_from.is_match(outgoing_desc));

    Ok(forward || reverse)
}

fn build(pattern: &str) -> Result<regex::Regex, TransferError> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TransferError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
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
    fn matches_exchange_amount_strategy_with_high_confidence() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        let mut outgoing = txn(0, "wise", -50.0, "USD", "Sent money to Alice Example", date);
        outgoing.exchange_amount = Some(13900.0);
        outgoing.exchange_currency = Some("PKR".to_string());
        let incoming = txn(1, "nayapay", 13900.0, "PKR", "Incoming fund transfer from Alice Example", date);

        let outcome = match_cross_bank(&[outgoing, incoming], &HashSet::new(), "Alice Example", 72, 0.7).unwrap();

        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].strategy, MatchStrategy::ExchangeAmount);
        assert!(outcome.pairs[0].confidence >= 0.9);
    }

    #[test]
    fn ties_produce_a_conflict_and_commit_nothing() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let outgoing = txn(0, "wise", -100.0, "USD", "transfer to Alice", date);
        let incoming_a = txn(1, "nayapay", 100.0, "USD", "transfer from Alice", date);
        let incoming_b = txn(2, "alfalah", 100.0, "USD", "transfer from Alice", date);

        let outcome = match_cross_bank(&[outgoing, incoming_a, incoming_b], &HashSet::new(), "Alice", 72, 0.7).unwrap();

        assert_eq!(outcome.pairs.len(), 0);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].incoming_indices.len(), 2);
    }

    #[test]
    fn name_gate_rejects_pairs_without_matching_user_pattern() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let outgoing = txn(0, "wise", -75.0, "USD", "ATM Withdrawal", date);
        let incoming = txn(1, "nayapay", 75.0, "USD", "Deposit", date);

        let outcome = match_cross_bank(&[outgoing, incoming], &HashSet::new(), "Alice Example", 72, 0.7).unwrap();
        assert_eq!(outcome.pairs.len(), 0);
        assert_eq!(outcome.conflicts.len(), 0);
    }
}
