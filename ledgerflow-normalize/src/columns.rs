//! Field resolution: locates a canonical field's value within a raw
//! header-keyed record (spec §4.7 steps 1–2), falling back through an
//! explicit alias table before a last-resort keyword search. Grounded on
//! spec §9's "dynamic field lookup with permissive fallback" redesign
//! flag: the alias table is explicit and ordered rather than scattered
//! `dict.get(a, dict.get(b, ...))` chains.

use std::collections::BTreeMap;
use std::collections::HashMap;

use ledgerflow_bankconfig::BankConfig;

pub const CANONICAL_FIELDS: &[&str] = &["Date", "Amount", "Title", "Note", "Currency", "Balance"];

const ALIASES: &[(&str, &[&str])] = &[
    ("Date", &["TIMESTAMP", "Date", "DATE", "Transaction Date", "Posting Date", "Value Date"]),
    ("Amount", &["AMOUNT", "Amount", "Total amount", "Total Amount"]),
    ("Title", &["DESCRIPTION", "Description", "Title", "Details", "Merchant", "Payee"]),
    ("Note", &["TYPE", "Type", "Note", "Notes"]),
    ("Currency", &["CURRENCY", "Currency"]),
    ("Balance", &["BALANCE", "Balance", "Running balance", "Running Balance"]),
];

/// Resolves `canonical` (one of [`CANONICAL_FIELDS`]) to a value in
/// `record`: the bank's `column_mapping` wins first, then an exact
/// same-name match, then the alias table, then a case-insensitive
/// substring search over every observed header (spec §4.7 step 2).
pub fn resolve(record: &BTreeMap<String, String>, bank: Option<&BankConfig>, canonical: &str) -> Option<String> {
    if let Some(bank) = bank
        && let Some(source) = bank.column_mapping.get(canonical)
        && let Some(value) = record.get(source)
    {
        return Some(value.clone());
    }

    if let Some(value) = record.get(canonical) {
        return Some(value.clone());
    }

    if let Some((_, aliases)) = ALIASES.iter().find(|(field, _)| *field == canonical) {
        for alias in *aliases {
            if let Some(value) = record.get(*alias) {
                return Some(value.clone());
            }
        }
    }

    let canonical_lower = canonical.to_lowercase();
    record
        .iter()
        .find(|(header, _)| header.to_lowercase().contains(&canonical_lower))
        .map(|(_, value)| value.clone())
}

/// Builds the `updated_column_mapping` returned alongside normalized rows
/// (spec §4.7 step 2 / §6 `cleaning_summary`): canonical field name →
/// the bank-configured source header, empty when unmapped.
pub fn updated_column_mapping(bank: Option<&BankConfig>) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for field in CANONICAL_FIELDS {
        let resolved = bank
            .and_then(|b| b.column_mapping.get(*field).cloned())
            .unwrap_or_default();
        mapping.insert((*field).to_string(), resolved);
    }
    mapping.entry("Category".to_string()).or_default();
    mapping.entry("Account".to_string()).or_default();
    mapping
}

const EXCHANGE_AMOUNT_COLUMNS: &[&str] = &[
    "Exchange To Amount",
    "Exchange_To_Amount",
    "ExchangeToAmount",
    "exchange_to_amount",
    "Exchange Amount",
    "ExchangeAmount",
    "exchange_amount",
    "Total",
    "Total Amount",
    "Converted Amount",
    "Target Amount",
    "Destination Amount",
];

const EXCHANGE_CURRENCY_COLUMNS: &[&str] = &[
    "Exchange To",
    "Exchange_To",
    "ExchangeTo",
    "exchange_to",
    "Target Currency",
    "Destination Currency",
    "To Currency",
    "Currency To",
    "Currency_To",
    "CurrencyTo",
];

fn is_blank_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || matches!(trimmed.to_lowercase().as_str(), "nan" | "null" | "none")
}

/// Extracts the destination-side exchange amount of a currency
/// conversion (spec §4.8.3 / GLOSSARY "Exchange amount"), trying the
/// explicit alias table first, then a keyword-combination fallback
/// (`exchange`/`convert`/`total`/`destination`/`target` crossed with
/// `amount`/`value`/`sum`). Grounded on
/// `examples/original_source/backend/transfer_detection/exchange_analyzer.py::get_exchange_to_amount`.
pub fn resolve_exchange_amount(record: &BTreeMap<String, String>) -> Option<f64> {
    for column in EXCHANGE_AMOUNT_COLUMNS {
        if let Some(value) = record.get(*column)
            && !is_blank_token(value)
        {
            let parsed = crate::numeric::parse_amount(value);
            if parsed != 0.0 {
                return Some(parsed.abs());
            }
        }
    }

    let exchange_keywords = ["exchange", "convert", "total", "destination", "target"];
    let amount_keywords = ["amount", "value", "sum"];
    for (header, value) in record {
        let header_lower = header.to_lowercase();
        let has_exchange = exchange_keywords.iter().any(|kw| header_lower.contains(kw));
        let has_amount = amount_keywords.iter().any(|kw| header_lower.contains(kw));
        if has_exchange && has_amount && !is_blank_token(value) {
            let parsed = crate::numeric::parse_amount(value);
            if parsed != 0.0 {
                return Some(parsed.abs());
            }
        }
    }

    None
}

/// Extracts the destination-side currency of a currency conversion,
/// mirroring [`resolve_exchange_amount`]'s alias-then-keyword strategy.
/// Grounded on the same `exchange_analyzer.py::get_exchange_to_currency`.
pub fn resolve_exchange_currency(record: &BTreeMap<String, String>) -> Option<String> {
    for column in EXCHANGE_CURRENCY_COLUMNS {
        if let Some(value) = record.get(*column)
            && !is_blank_token(value)
        {
            return Some(value.trim().to_uppercase());
        }
    }

    for (header, value) in record {
        let header_lower = header.to_lowercase();
        let is_exchange_to = header_lower.contains("exchange") && header_lower.contains("to");
        let is_target_currency = (header_lower.contains("target")
            || header_lower.contains("destination")
            || header_lower.contains("to"))
            && header_lower.contains("currency");
        if (is_exchange_to || is_target_currency) && !is_blank_token(value) {
            let candidate = value.trim().to_uppercase();
            if candidate.len() == 3 && candidate.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn resolves_via_bank_column_mapping_first() {
        let mut bank = BankConfig::default();
        bank.column_mapping.insert("Date".to_string(), "TIMESTAMP".to_string());
        let rec = record(&[("TIMESTAMP", "2025-01-15"), ("Date", "wrong")]);
        assert_eq!(resolve(&rec, Some(&bank), "Date").as_deref(), Some("2025-01-15"));
    }

    #[test]
    fn falls_back_to_alias_table_without_bank_config() {
        let rec = record(&[("DESCRIPTION", "Coffee")]);
        assert_eq!(resolve(&rec, None, "Title").as_deref(), Some("Coffee"));
    }

    #[test]
    fn falls_back_to_substring_search_as_last_resort() {
        let rec = record(&[("Account Balance (USD)", "100.00")]);
        assert_eq!(resolve(&rec, None, "Balance").as_deref(), Some("100.00"));
    }

    #[test]
    fn exchange_amount_resolves_exact_alias_first() {
        let rec = record(&[("Exchange To Amount", "13,900.00"), ("Total", "999")]);
        assert_eq!(resolve_exchange_amount(&rec), Some(13900.0));
    }

    #[test]
    fn exchange_amount_falls_back_to_keyword_search() {
        let rec = record(&[("Converted Target Value", "200000")]);
        assert_eq!(resolve_exchange_amount(&rec), Some(200000.0));
    }

    #[test]
    fn exchange_currency_validates_three_letter_code() {
        let rec = record(&[("Destination Currency", "pkr")]);
        assert_eq!(resolve_exchange_currency(&rec).as_deref(), Some("PKR"));
    }

    #[test]
    fn exchange_currency_rejects_non_currency_fallback_values() {
        let rec = record(&[("Target Currency Notes", "this is not a code")]);
        assert_eq!(resolve_exchange_currency(&rec), None);
    }
}
