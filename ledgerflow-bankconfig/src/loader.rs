//! Builds a [`BankConfig`] from an [`IniDocument`] (spec §6 section layout).

use crate::conf::IniDocument;
use crate::error::BankConfigError;
use crate::types::BankConfig;
use crate::types::ConditionalOverride;
use crate::types::CsvConfig;
use crate::types::DataCleaningConfig;
use crate::types::DetectionConfig;

/// Parses the `.conf` text for a single bank. `path` is used only in error
/// messages.
pub fn load_bank_config(path: &str, text: &str) -> Result<BankConfig, BankConfigError> {
    let doc = IniDocument::parse(path, text)?;
    build_config(path, &doc)
}

fn build_config(path: &str, doc: &IniDocument) -> Result<BankConfig, BankConfigError> {
    let bank_info = doc.section("bank_info").ok_or_else(|| BankConfigError::MissingKey {
        path: path.to_string(),
        key: "[bank_info]".to_string(),
    })?;
    let name = bank_info
        .get("name")
        .ok_or_else(|| BankConfigError::MissingKey {
            path: path.to_string(),
            key: "name".to_string(),
        })?
        .to_string();
    let display_name = bank_info.get("display_name").unwrap_or(&name).to_string();
    let primary_currency = bank_info
        .get("primary_currency")
        .unwrap_or("USD")
        .to_uppercase();
    let cashew_account = bank_info.get("cashew_account").map(str::to_string);
    let family = bank_info.get("family").map(str::to_string);

    let detection = doc
        .section("detection")
        .map(|section| parse_detection(path, section))
        .transpose()?
        .unwrap_or_default();

    let csv_config = doc
        .section("csv_config")
        .map(parse_csv_config)
        .unwrap_or_default();

    let column_mapping = doc
        .section("column_mapping")
        .map(|section| section.entries.iter().cloned().collect())
        .unwrap_or_default();

    let account_mapping = doc
        .section("account_mapping")
        .map(|section| {
            section
                .entries
                .iter()
                .map(|(currency, account)| (currency.to_uppercase(), account.clone()))
                .collect()
        })
        .unwrap_or_default();

    let data_cleaning = parse_data_cleaning(doc);

    let (outgoing_patterns, incoming_patterns) = doc
        .section("transfer_patterns")
        .map(|section| (section.get_list("outgoing_patterns"), section.get_list("incoming_patterns")))
        .unwrap_or_default();

    let categorization_rules = doc
        .section("categorization")
        .map(|section| section.entries.clone())
        .unwrap_or_default();
    let default_category_rules = doc
        .section("default_category_rules")
        .map(|section| section.entries.clone())
        .unwrap_or_default();

    let mut conditional_overrides = Vec::new();
    for section in doc.sections_with_prefix("conditional_override_") {
        conditional_overrides.push(parse_conditional_override(path, section)?);
    }

    Ok(BankConfig {
        name,
        display_name,
        primary_currency,
        cashew_account,
        family,
        detection,
        csv_config,
        column_mapping,
        account_mapping,
        data_cleaning,
        outgoing_patterns,
        incoming_patterns,
        categorization_rules,
        default_category_rules,
        conditional_overrides,
    })
}

fn parse_detection(
    path: &str,
    section: &crate::conf::IniSection,
) -> Result<DetectionConfig, BankConfigError> {
    for pattern in section.get_list("filename_regexes") {
        regex::Regex::new(&pattern).map_err(|source| BankConfigError::InvalidRegex {
            path: path.to_string(),
            pattern: pattern.clone(),
            context: "detection.filename_regexes".to_string(),
            source,
        })?;
    }
    let confidence_weight = section
        .get("confidence_weight")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(1.0);

    Ok(DetectionConfig {
        filename_substrings: section.get_list("filename_substrings"),
        filename_regexes: section.get_list("filename_regexes"),
        content_signatures: section.get_list("content_signatures"),
        expected_headers: section.get_list("expected_headers"),
        confidence_weight,
    })
}

fn parse_csv_config(section: &crate::conf::IniSection) -> CsvConfig {
    CsvConfig {
        delimiter: section.get("delimiter").and_then(|v| v.chars().next()),
        quote_char: section.get("quote_char").and_then(|v| v.chars().next()),
        encoding_hint: section.get("encoding_hint").map(str::to_string),
        has_header: section
            .get("has_header")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(true),
        header_row: section.get("header_row").and_then(|v| v.parse::<usize>().ok()),
        skip_rows: section
            .get("skip_rows")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0),
    }
}

fn parse_data_cleaning(doc: &IniDocument) -> DataCleaningConfig {
    let currency_symbols = doc
        .section("data_cleaning")
        .map(|s| s.get_list("currency_symbols"))
        .unwrap_or_default();
    let date_formats = doc
        .section("data_cleaning")
        .map(|s| s.get_list("date_formats"))
        .unwrap_or_default();
    let decimal_separator = doc
        .section("data_cleaning")
        .and_then(|s| s.get("decimal_separator"))
        .and_then(|v| v.chars().next());
    let thousand_separator = doc
        .section("data_cleaning")
        .and_then(|s| s.get("thousand_separator"))
        .and_then(|v| v.chars().next());
    let description_cleaning_rules = doc
        .section("description_cleaning")
        .map(|s| s.entries.iter().map(|(_, v)| v.clone()).collect())
        .unwrap_or_default();

    DataCleaningConfig {
        currency_symbols,
        date_formats,
        decimal_separator,
        thousand_separator,
        description_cleaning_rules,
    }
}

fn parse_conditional_override(
    path: &str,
    section: &crate::conf::IniSection,
) -> Result<ConditionalOverride, BankConfigError> {
    let parse_f64 = |key: &str| -> Result<Option<f64>, BankConfigError> {
        match section.get(key) {
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| BankConfigError::InvalidOverrideValue {
                    path: path.to_string(),
                    section: section.name.clone(),
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            None => Ok(None),
        }
    };

    Ok(ConditionalOverride {
        name: section
            .name
            .strip_prefix("conditional_override_")
            .unwrap_or(&section.name)
            .to_string(),
        if_amount_min: parse_f64("if_amount_min")?,
        if_amount_max: parse_f64("if_amount_max")?,
        if_amount_less_than: parse_f64("if_amount_less_than")?,
        if_amount_greater_than: parse_f64("if_amount_greater_than")?,
        if_amount_equals: parse_f64("if_amount_equals")?,
        if_note_equals: section.get("if_note_equals").map(str::to_string),
        if_note_contains: section.get("if_note_contains").map(str::to_string),
        if_description_contains: section.get("if_description_contains").map(str::to_string),
        set_description: section.get("set_description").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WISE_CONF: &str = "\
[bank_info]
name = wise
display_name = Wise
primary_currency = USD
family = wise

[detection]
filename_substrings = wise, transferwise
content_signatures = wise transfer, exchange to amount
expected_headers = TIMESTAMP, AMOUNT, DESCRIPTION
confidence_weight = 1.0

[csv_config]
delimiter = ,
has_header = true

[column_mapping]
Date = TIMESTAMP
Amount = AMOUNT
Title = DESCRIPTION

[account_mapping]
USD = Wise USD
EUR = Wise EUR

[description_cleaning]
rule1 = Card Transaction\\|remove
rule2 = \\s+ Fees

[categorization]
Shell.*Petrol = Transport
electronics = Electronics

[default_category_rules]
coffee = Dining

[transfer_patterns]
outgoing_patterns = sent money to {name}, transfer to {name}
incoming_patterns = transfer from {name}

[conditional_override_ride_hailing]
if_description_contains = Outgoing fund transfer to
if_amount_min = -2000
if_amount_max = -0.01
if_note_equals = Raast Out
set_description = Ride Hailing Services
";

    #[test]
    fn parses_full_bank_config() {
        let config = load_bank_config("wise.conf", WISE_CONF).expect("parses");
        assert_eq!(config.name, "wise");
        assert_eq!(config.primary_currency, "USD");
        assert_eq!(config.family.as_deref(), Some("wise"));
        assert_eq!(config.detection.filename_substrings, vec!["wise", "transferwise"]);
        assert_eq!(config.detection.confidence_weight, 1.0);
        assert_eq!(config.column_mapping.get("Date").unwrap(), "TIMESTAMP");
        assert_eq!(config.account_mapping.get("USD").unwrap(), "Wise USD");
        assert_eq!(config.categorization_rules.len(), 2);
        assert_eq!(config.conditional_overrides.len(), 1);
        assert_eq!(config.conditional_overrides[0].name, "ride_hailing");
        assert_eq!(config.outgoing_patterns, vec!["sent money to {name}", "transfer to {name}"]);
    }

    #[test]
    fn missing_bank_info_section_is_an_error() {
        let err = load_bank_config("bad.conf", "[csv_config]\ndelimiter = ,\n").unwrap_err();
        assert!(matches!(err, BankConfigError::MissingKey { .. }));
    }

    #[test]
    fn missing_name_key_is_an_error() {
        let err = load_bank_config("bad.conf", "[bank_info]\ndisplay_name = X\n").unwrap_err();
        assert!(matches!(err, BankConfigError::MissingKey { .. }));
    }

    #[test]
    fn invalid_filename_regex_is_rejected() {
        let text = "[bank_info]\nname = x\n\n[detection]\nfilename_regexes = ( invalid\n";
        let err = load_bank_config("bad.conf", text).unwrap_err();
        assert!(matches!(err, BankConfigError::InvalidRegex { .. }));
    }
}
