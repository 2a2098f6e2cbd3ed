//! Flagging of unmatched candidates and large non-candidate rows
//! (spec §4.8.5 second clause: "non-candidate transactions with
//! `|amount| >= 10,000` whose description contains any of {transfer,
//! convert, exchange, send}").

const LARGE_AMOUNT_THRESHOLD: f64 = 10_000.0;
const LARGE_AMOUNT_KEYWORDS: &[&str] = &["transfer", "convert", "exchange", "send"];

/// Whether a transaction that did **not** match any §4.8.1 candidate
/// pattern should still be flagged for manual review due to its size and
/// wording.
pub fn is_large_unmatched_candidate(amount: f64, description: &str) -> bool {
    if amount.abs() < LARGE_AMOUNT_THRESHOLD {
        return false;
    }
    let lower = description.to_lowercase();
    LARGE_AMOUNT_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_large_transfer_worded_amount() {
        assert!(is_large_unmatched_candidate(-15000.0, "Large exchange settlement"));
    }

    #[test]
    fn does_not_flag_small_amounts() {
        assert!(!is_large_unmatched_candidate(-500.0, "Exchange fee"));
    }

    #[test]
    fn does_not_flag_large_amounts_without_keyword() {
        assert!(!is_large_unmatched_candidate(20000.0, "Monthly salary"));
    }
}
