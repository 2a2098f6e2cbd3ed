//! Row normalization orchestrator (spec §4.7). Drives field resolution,
//! numeric/date parsing, invalid-row removal, currency defaulting,
//! description cleaning, conditional overrides, categorization, account
//! resolution, and exchange-field extraction into the canonical
//! [`ledgerflow_core::Transaction`] schema, in that order.

use std::collections::BTreeMap;
use std::collections::HashMap;

use ledgerflow_bankconfig::BankConfig;
use ledgerflow_core::Transaction;

use crate::account;
use crate::categorize;
use crate::cleaning;
use crate::columns;
use crate::dates;
use crate::error::NormalizeError;
use crate::numeric;

const DEFAULT_CURRENCY: &str = "USD";

/// Result of normalizing one bank's batch of raw records.
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub transactions: Vec<Transaction>,
    pub updated_column_mapping: HashMap<String, String>,
    pub rows_seen: usize,
    pub rows_dropped: usize,
    pub warnings: Vec<String>,
}

/// Normalizes `records` into canonical transactions.
///
/// `source_bank` is the lower-case bank identifier stamped onto every row;
/// `filename` feeds the last-resort account-name fallback; `start_index`
/// is the first `transaction_index` assigned, incrementing by one per
/// emitted row (spec §3: "Stable integer assigned at ingestion").
pub fn normalize(
    records: &[BTreeMap<String, String>],
    bank: Option<&BankConfig>,
    source_bank: &str,
    filename: &str,
    start_index: u64,
) -> Result<NormalizeOutcome, NormalizeError> {
    let mut transactions = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();
    let mut rows_dropped = 0usize;
    let mut next_index = start_index;

    let empty_cleaning_rules: Vec<String> = Vec::new();
    let empty_overrides: Vec<ledgerflow_bankconfig::ConditionalOverride> = Vec::new();
    let empty_bank_rules: Vec<(String, String)> = Vec::new();
    let empty_default_rules: Vec<(String, String)> = Vec::new();

    let cleaning_rules = bank.map_or(&empty_cleaning_rules, |b| &b.data_cleaning.description_cleaning_rules);
    let overrides = bank.map_or(&empty_overrides, |b| &b.conditional_overrides);
    let bank_rules = bank.map_or(&empty_bank_rules, |b| &b.categorization_rules);
    let default_rules = bank.map_or(&empty_default_rules, |b| &b.default_category_rules);
    let extra_date_formats = bank.map_or(&[] as &[String], |b| &b.data_cleaning.date_formats);
    let extra_currency_symbols = bank.map_or(&[] as &[String], |b| &b.data_cleaning.currency_symbols);
    let decimal_separator = bank.and_then(|b| b.data_cleaning.decimal_separator);
    let thousand_separator = bank.and_then(|b| b.data_cleaning.thousand_separator);
    let primary_currency = bank.map(|b| b.primary_currency.as_str()).filter(|c| !c.is_empty());

    for record in records {
        let raw_date = columns::resolve(record, bank, "Date");
        let raw_amount = columns::resolve(record, bank, "Amount");
        let raw_title = columns::resolve(record, bank, "Title").unwrap_or_default();
        let raw_note = columns::resolve(record, bank, "Note");
        let raw_currency = columns::resolve(record, bank, "Currency");
        let raw_balance = columns::resolve(record, bank, "Balance");

        let amount = raw_amount
            .as_deref()
            .map(|raw| numeric::parse_amount_with(raw, extra_currency_symbols, decimal_separator, thousand_separator))
            .unwrap_or(0.0);
        let date = raw_date.as_deref().and_then(|raw| dates::parse_date(raw, extra_date_formats));
        let balance = raw_balance
            .as_deref()
            .map(|raw| numeric::parse_amount_with(raw, extra_currency_symbols, decimal_separator, thousand_separator));

        let Some(date) = date else {
            rows_dropped += 1;
            continue;
        };
        if amount == 0.0 {
            rows_dropped += 1;
            continue;
        }

        let currency = raw_currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .or_else(|| primary_currency.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let cleaned_description = cleaning::apply_description_cleaning(&raw_title, cleaning_rules)?;
        let note = raw_note.filter(|n| !n.trim().is_empty());
        let overridden_description = cleaning::apply_conditional_overrides(
            overrides,
            amount,
            note.as_deref().unwrap_or(""),
            &cleaned_description,
        )
        .to_string();

        let category = categorize::categorize(&overridden_description, bank_rules, default_rules)?.unwrap_or_default();
        let account = account::resolve_account(bank, &currency, filename);

        let exchange_amount = columns::resolve_exchange_amount(record);
        let exchange_currency = columns::resolve_exchange_currency(record);

        transactions.push(Transaction {
            date,
            amount,
            currency,
            description: overridden_description,
            note,
            category,
            account,
            balance,
            source_bank: source_bank.to_string(),
            transaction_index: next_index,
            exchange_amount,
            exchange_currency,
            raw: record.clone(),
        });
        next_index += 1;
    }

    if rows_dropped > 0 {
        warnings.push(format!("{rows_dropped} row(s) dropped: missing amount or unparsable date"));
    }

    Ok(NormalizeOutcome {
        transactions,
        updated_column_mapping: columns::updated_column_mapping(bank),
        rows_seen: records.len(),
        rows_dropped,
        warnings,
    })
}
