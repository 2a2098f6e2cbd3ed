//! Account resolution (spec §4.7 step 10). Grounded on spec §3's
//! `account_mapping`/`cashew_account` fields and the original's fallback
//! to a filename-derived account name when no bank config applies.

use ledgerflow_bankconfig::BankConfig;

/// Resolves the ledger account a row should post against: a per-currency
/// `account_mapping` entry wins first, then the bank's single
/// `cashew_account`, then a title-cased name derived from the source
/// filename.
pub fn resolve_account(bank: Option<&BankConfig>, currency: &str, filename: &str) -> String {
    if let Some(bank) = bank {
        if let Some(account) = bank.account_mapping.get(currency) {
            return account.clone();
        }
        if let Some(account) = &bank.cashew_account {
            return account.clone();
        }
    }

    title_case_from_filename(filename)
}

fn title_case_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('/')
        .map_or(filename, |(_, name)| name)
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem);

    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
