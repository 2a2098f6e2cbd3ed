//! Bank Configuration data model (spec §3). Immutable once loaded; built
//! from an [`crate::conf::IniDocument`] by [`crate::loader::load_bank_config`].

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DetectionConfig {
    pub filename_substrings: Vec<String>,
    pub filename_regexes: Vec<String>,
    pub content_signatures: Vec<String>,
    pub expected_headers: Vec<String>,
    pub confidence_weight: f64,
}

#[derive(Debug, Clone)]
pub struct CsvConfig {
    pub delimiter: Option<char>,
    pub quote_char: Option<char>,
    pub encoding_hint: Option<String>,
    pub has_header: bool,
    /// 1-indexed, as written in the config file.
    pub header_row: Option<usize>,
    pub skip_rows: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote_char: None,
            encoding_hint: None,
            has_header: true,
            header_row: None,
            skip_rows: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataCleaningConfig {
    pub currency_symbols: Vec<String>,
    pub date_formats: Vec<String>,
    pub decimal_separator: Option<char>,
    pub thousand_separator: Option<char>,
    /// Each entry either `pattern|replacement` (regex substitution) or a
    /// literal substring to remove (spec §4.7 step 7).
    pub description_cleaning_rules: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConditionalOverride {
    pub name: String,
    pub if_amount_min: Option<f64>,
    pub if_amount_max: Option<f64>,
    pub if_amount_less_than: Option<f64>,
    pub if_amount_greater_than: Option<f64>,
    pub if_amount_equals: Option<f64>,
    pub if_note_equals: Option<String>,
    pub if_note_contains: Option<String>,
    pub if_description_contains: Option<String>,
    pub set_description: String,
}

impl ConditionalOverride {
    /// Evaluates every configured predicate; a rule with no predicates at
    /// all never matches (an empty override would otherwise rewrite every
    /// row, which is never the intent of a declared rule).
    #[must_use]
    pub fn matches(&self, amount: f64, note: &str, description: &str) -> bool {
        let mut had_predicate = false;

        if let Some(min) = self.if_amount_min {
            had_predicate = true;
            if amount < min {
                return false;
            }
        }
        if let Some(max) = self.if_amount_max {
            had_predicate = true;
            if amount > max {
                return false;
            }
        }
        if let Some(less_than) = self.if_amount_less_than {
            had_predicate = true;
            if !(amount < less_than) {
                return false;
            }
        }
        if let Some(greater_than) = self.if_amount_greater_than {
            had_predicate = true;
            if !(amount > greater_than) {
                return false;
            }
        }
        if let Some(equals) = self.if_amount_equals {
            had_predicate = true;
            if (amount - equals).abs() > f64::EPSILON {
                return false;
            }
        }
        if let Some(expected) = &self.if_note_equals {
            had_predicate = true;
            if !note.eq_ignore_ascii_case(expected) {
                return false;
            }
        }
        if let Some(needle) = &self.if_note_contains {
            had_predicate = true;
            if !note.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(needle) = &self.if_description_contains {
            had_predicate = true;
            if !description.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        had_predicate
    }
}

#[derive(Debug, Clone, Default)]
pub struct BankConfig {
    pub name: String,
    pub display_name: String,
    pub primary_currency: String,
    pub cashew_account: Option<String>,
    /// Name of a `*_family.conf` this bank inherits from, if any (spec §9
    /// "config inheritance via family files").
    pub family: Option<String>,

    pub detection: DetectionConfig,
    pub csv_config: CsvConfig,

    /// canonical field (`Date`, `Amount`, ...) → source header.
    pub column_mapping: HashMap<String, String>,
    /// currency code (uppercase) → logical account name.
    pub account_mapping: HashMap<String, String>,

    pub data_cleaning: DataCleaningConfig,

    pub outgoing_patterns: Vec<String>,
    pub incoming_patterns: Vec<String>,

    /// (pattern, category), in declaration order.
    pub categorization_rules: Vec<(String, String)>,
    pub default_category_rules: Vec<(String, String)>,
    pub conditional_overrides: Vec<ConditionalOverride>,
}

impl BankConfig {
    /// Merges `family` config underneath `self`: bank-declared entries take
    /// priority on key collision (maps), and are applied before inherited
    /// entries in ordered lists (spec §9: "bank rules override family rules
    /// override global rules").
    #[must_use]
    pub fn with_family_fallback(mut self, family: &BankConfig) -> Self {
        for (key, value) in &family.column_mapping {
            self.column_mapping.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in &family.account_mapping {
            self.account_mapping.entry(key.clone()).or_insert_with(|| value.clone());
        }

        self.data_cleaning
            .currency_symbols
            .extend(family.data_cleaning.currency_symbols.iter().cloned());
        self.data_cleaning
            .date_formats
            .extend(family.data_cleaning.date_formats.iter().cloned());
        self.data_cleaning
            .description_cleaning_rules
            .extend(family.data_cleaning.description_cleaning_rules.iter().cloned());
        if self.data_cleaning.decimal_separator.is_none() {
            self.data_cleaning.decimal_separator = family.data_cleaning.decimal_separator;
        }
        if self.data_cleaning.thousand_separator.is_none() {
            self.data_cleaning.thousand_separator = family.data_cleaning.thousand_separator;
        }

        self.outgoing_patterns.extend(family.outgoing_patterns.iter().cloned());
        self.incoming_patterns.extend(family.incoming_patterns.iter().cloned());
        self.categorization_rules.extend(family.categorization_rules.iter().cloned());
        self.default_category_rules
            .extend(family.default_category_rules.iter().cloned());
        self.conditional_overrides
            .extend(family.conditional_overrides.iter().cloned());

        if self.cashew_account.is_none() {
            self.cashew_account = family.cashew_account.clone();
        }
        if self.primary_currency.is_empty() {
            self.primary_currency = family.primary_currency.clone();
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditional_override_requires_all_predicates() {
        let rule = ConditionalOverride {
            name: "ride_hailing".to_string(),
            if_amount_min: Some(-2000.0),
            if_amount_max: Some(-0.01),
            if_amount_less_than: None,
            if_amount_greater_than: None,
            if_amount_equals: None,
            if_note_equals: Some("Raast Out".to_string()),
            if_note_contains: None,
            if_description_contains: Some("Outgoing fund transfer to".to_string()),
            set_description: "Ride Hailing Services".to_string(),
        };
        assert!(rule.matches(-1500.0, "Raast Out", "Outgoing fund transfer to X"));
        assert!(!rule.matches(-1500.0, "Different Note", "Outgoing fund transfer to X"));
        assert!(!rule.matches(50.0, "Raast Out", "Outgoing fund transfer to X"));
    }

    #[test]
    fn rule_with_no_predicates_never_matches() {
        let rule = ConditionalOverride {
            name: "empty".to_string(),
            if_amount_min: None,
            if_amount_max: None,
            if_amount_less_than: None,
            if_amount_greater_than: None,
            if_amount_equals: None,
            if_note_equals: None,
            if_note_contains: None,
            if_description_contains: None,
            set_description: "x".to_string(),
        };
        assert!(!rule.matches(0.0, "", ""));
    }

    #[test]
    fn family_fallback_fills_missing_column_mapping_entries() {
        let mut bank = BankConfig {
            name: "wise-usd".to_string(),
            ..Default::default()
        };
        bank.column_mapping.insert("Date".to_string(), "TIMESTAMP".to_string());

        let mut family = BankConfig {
            name: "wise".to_string(),
            ..Default::default()
        };
        family.column_mapping.insert("Date".to_string(), "IGNORED".to_string());
        family.column_mapping.insert("Amount".to_string(), "AMOUNT".to_string());

        let merged = bank.with_family_fallback(&family);
        assert_eq!(merged.column_mapping.get("Date").unwrap(), "TIMESTAMP");
        assert_eq!(merged.column_mapping.get("Amount").unwrap(), "AMOUNT");
    }
}
