//! Numeric amount parsing (spec §4.7 step 3). Grounded on
//! `examples/original_source/backend/data_cleaner.py::_parse_numeric_value`:
//! strips currency symbols and whitespace, treats parenthesized values as
//! negative, strips thousands separators, then parses the remainder.

const DEFAULT_CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Parses a raw cell into a signed amount. Unparseable input yields `0.0`,
/// matching the Python original's `except ValueError: return 0.0` fallback
/// (spec §4.7 treats an unparseable amount identically to a literal zero
/// for the purposes of invalid-row removal).
pub fn parse_amount(raw: &str) -> f64 {
    parse_amount_with(raw, &[], None, None)
}

/// As [`parse_amount`], but honoring bank-specific currency symbols and
/// decimal/thousand separator overrides (spec §4.7 step 3, bank
/// `data_cleaning` config).
pub fn parse_amount_with(
    raw: &str,
    extra_symbols: &[String],
    decimal_separator: Option<char>,
    thousand_separator: Option<char>,
) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let mut text = trimmed.to_string();

    let negative_parens = text.starts_with('(') && text.ends_with(')') && text.len() > 1;
    if negative_parens {
        text = text[1..text.len() - 1].to_string();
    }

    for symbol in DEFAULT_CURRENCY_SYMBOLS {
        text = text.replace(*symbol, "");
    }
    for symbol in extra_symbols {
        text = text.replace(symbol.as_str(), "");
    }
    for code in ["PKR", "USD", "EUR", "GBP", "CAD", "AUD", "HUF"] {
        text = text.replace(code, "");
    }

    let thousand = thousand_separator.unwrap_or(',');
    text = text.replace(thousand, "");

    if let Some(decimal) = decimal_separator
        && decimal != '.'
    {
        text = text.replace(decimal, ".");
    }

    text.retain(|c| !c.is_whitespace());

    if text.is_empty() || text == "-" || text == "+" {
        return 0.0;
    }

    let parsed = text.parse::<f64>().unwrap_or(0.0);
    if negative_parens { -parsed.abs() } else { parsed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_parenthesized_value_as_negative() {
        assert_eq!(parse_amount("(1,234.56)"), -1234.56);
    }

    #[test]
    fn parses_leading_plus_with_internal_space() {
        assert_eq!(parse_amount("+ 1,000"), 1000.0);
    }

    #[test]
    fn strips_currency_symbols_and_codes() {
        assert_eq!(parse_amount("$1,200.50"), 1200.50);
        assert_eq!(parse_amount("PKR 5,000"), 5000.0);
    }

    #[test]
    fn unparseable_input_yields_zero() {
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn honors_bank_specific_decimal_separator() {
        assert_eq!(parse_amount_with("1.234,56", &[], Some(','), Some('.')), 1234.56);
    }

    #[test]
    fn plain_negative_sign_is_preserved() {
        assert_eq!(parse_amount("-42.10"), -42.10);
    }
}
