//! Transfer-candidate identification (spec §4.8.1) and currency-conversion
//! descriptor extraction (spec §4.8.2). Grounded on
//! `examples/original_source/backend/transfer_detection/currency_converter.py::extract_conversion_info`
//! for the conversion patterns, and spec §4.8.1's pattern list for the
//! generic/user-named candidate check.

use regex::Regex;
use regex::RegexBuilder;

use crate::error::TransferError;

/// The parsed `Converted X CUR1 to Y CUR2` descriptor of a candidate row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionInfo {
    pub from_amount: f64,
    pub from_currency: String,
    pub to_amount: f64,
    pub to_currency: String,
}

fn build(pattern: &str) -> Result<Regex, TransferError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TransferError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Tries each conversion pattern in order, most specific first, and
/// returns the first that matches. Mirrors the original's three-pattern
/// fallback (strict "from X balance to Y", loose ".*?to", and the
/// explicit "from balance" variant restated for clarity).
pub fn extract_conversion_info(description: &str) -> Result<Option<ConversionInfo>, TransferError> {
    const PATTERNS: &[&str] = &[
        r"converted\s+([\d,.]+)\s+(\w{3})\s+(?:from\s+\w{3}\s+balance\s+)?to\s+([\d,.]+)\s*(\w{3})",
        r"converted\s+([\d,.]+)\s+(\w{3}).*?to\s+([\d,.]+)\s*(\w{3})",
    ];

    for pattern in PATTERNS {
        let regex = build(pattern)?;
        if let Some(captures) = regex.captures(description) {
            let from_amount = captures[1].replace(',', "").parse::<f64>().unwrap_or(0.0);
            let to_amount = captures[3].replace(',', "").parse::<f64>().unwrap_or(0.0);
            return Ok(Some(ConversionInfo {
                from_amount,
                from_currency: captures[2].to_uppercase(),
                to_amount,
                to_currency: captures[4].to_uppercase(),
            }));
        }
    }

    Ok(None)
}

/// Whether `description` matches any spec §4.8.1 transfer pattern:
/// currency-conversion, user-named (gated on `user_name`), or generic.
pub fn is_candidate(description: &str, user_name: &str) -> Result<bool, TransferError> {
    if extract_conversion_info(description)?.is_some() {
        return Ok(true);
    }

    if !user_name.trim().is_empty() {
        let escaped = regex::escape(user_name.trim());
        let user_patterns = [
            format!(r"sent\s+(?:money\s+)?to\s+{escaped}"),
            format!(r"transfer\s+to\s+{escaped}"),
            format!(r"transfer\s+from\s+{escaped}"),
            format!(r"incoming.*transfer\s+from\s+{escaped}"),
        ];
        for pattern in &user_patterns {
            if build(pattern)?.is_match(description) {
                return Ok(true);
            }
        }
    }

    const GENERIC_PATTERNS: &[&str] = &[
        r"transfer\s+to\s+\w+",
        r"transfer\s+from\s+\w+",
        r"incoming\s+fund\s+transfer",
        r"fund\s+transfer\s+from",
    ];
    for pattern in GENERIC_PATTERNS {
        if build(pattern)?.is_match(description) {
            return Ok(true);
        }
    }

    Ok(false)
}
