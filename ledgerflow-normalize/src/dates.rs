//! Date parsing (spec §4.7 step 3). Grounded on
//! `examples/original_source/backend/data_cleaner.py::_parse_date_value`'s
//! ordered format list — tried in order, first successful parse wins.

use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Tried in this order (spec §4.7 step 5, verbatim); bank-specific formats
/// from `DataCleaningConfig` are appended after these, so a bank's override
/// only ever adds a candidate rather than replacing the defaults.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d %b %Y %I:%M %p",
    "%d %b %Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses `raw` against [`DEFAULT_DATE_FORMATS`] followed by `extra_formats`,
/// returning the date component of the first match. `None` means no format
/// matched (spec §4.7: such a row has no parsed date for invalid-row
/// removal purposes).
pub fn parse_date(raw: &str, extra_formats: &[String]) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DEFAULT_DATE_FORMATS.iter().copied().chain(extra_formats.iter().map(String::as_str)) {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_date("2025-01-15", &[]), NaiveDate::from_ymd_opt(2025, 1, 15));
    }

    #[test]
    fn parses_iso_datetime_to_date_component() {
        assert_eq!(
            parse_date("2025-02-03 23:17:00", &[]),
            NaiveDate::from_ymd_opt(2025, 2, 3)
        );
    }

    #[test]
    fn parses_day_month_abbreviation_with_time() {
        assert_eq!(
            parse_date("02 Feb 2025 11:17 PM", &[]),
            NaiveDate::from_ymd_opt(2025, 2, 2)
        );
    }

    #[test]
    fn day_month_slash_form_is_tried_before_month_day() {
        // %d/%m/%Y precedes %m/%d/%Y in the spec's ordered list, so an
        // unambiguous day-first value (13 can't be a month) must resolve
        // through the earlier format.
        assert_eq!(parse_date("13/03/2025", &[]), NaiveDate::from_ymd_opt(2025, 3, 13));
    }

    #[test]
    fn us_slash_format_is_the_fallback_for_ambiguous_values() {
        assert_eq!(parse_date("03/21/2025", &[]), NaiveDate::from_ymd_opt(2025, 3, 21));
    }

    #[test]
    fn bank_specific_format_is_tried_after_defaults() {
        let extra = vec!["%Y%m%d".to_string()];
        assert_eq!(parse_date("20250315", &extra), NaiveDate::from_ymd_opt(2025, 3, 15));
    }

    #[test]
    fn unparseable_value_yields_none() {
        assert_eq!(parse_date("not a date", &[]), None);
        assert_eq!(parse_date("", &[]), None);
    }
}
