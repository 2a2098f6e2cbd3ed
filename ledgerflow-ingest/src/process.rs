//! Data processor: turns raw parsed rows into header-keyed records (spec
//! §4.4), bank-agnostic. Runs after parsing, before `ledgerflow-bankconfig`
//! maps headers onto a specific bank's column names.

use std::collections::BTreeMap;

use crate::headers;

#[derive(Debug, Clone)]
pub struct ProcessingInfo {
    pub header_row: Option<usize>,
    pub data_start_row: usize,
    pub headers: Vec<String>,
    pub rows_seen: usize,
    pub rows_processed: usize,
    pub rows_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessedData {
    pub records: Vec<BTreeMap<String, String>>,
    pub info: ProcessingInfo,
}

/// Converts `raw_rows` (already split into fields by a parsing strategy)
/// into header-keyed records. `header_row` overrides auto-detection when
/// the caller already knows which row holds headers (spec §4.4 step 1);
/// `None` falls back to the same scoring `headers::best_header_row` uses
/// for structure analysis, so a caller that skipped structure analysis
/// still gets a sensible header row.
pub fn process(raw_rows: &[Vec<String>], header_row: Option<usize>) -> ProcessedData {
    if raw_rows.is_empty() {
        return ProcessedData {
            records: Vec::new(),
            info: ProcessingInfo {
                header_row: None,
                data_start_row: 0,
                headers: Vec::new(),
                rows_seen: 0,
                rows_processed: 0,
                rows_dropped: 0,
            },
        };
    }

    let detected = header_row.or_else(|| {
        headers::best_header_row(raw_rows, 5).filter(|&idx| headers::score_row(&raw_rows[idx]) > 0)
    });

    let (header_row_idx, data_start, column_headers) = match detected {
        Some(idx) if idx < raw_rows.len() => (
            Some(idx),
            idx + 1,
            headers::fill_blank_headers(raw_rows[idx].clone()),
        ),
        _ => {
            let width = raw_rows.first().map_or(0, Vec::len);
            (None, 0, (1..=width).map(|n| format!("Column_{n}")).collect())
        }
    };

    let data_rows = &raw_rows[data_start.min(raw_rows.len())..];
    let mut records = Vec::with_capacity(data_rows.len());
    let mut rows_dropped = 0usize;

    for row in data_rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            rows_dropped += 1;
            continue;
        }
        let mut record = BTreeMap::new();
        for (idx, key) in column_headers.iter().enumerate() {
            let value = row.get(idx).map(|cell| sanitize(cell)).unwrap_or_default();
            record.insert(key.clone(), value);
        }
        records.push(record);
    }

    let rows_processed = records.len();

    ProcessedData {
        records,
        info: ProcessingInfo {
            header_row: header_row_idx,
            data_start_row: data_start,
            headers: column_headers,
            rows_seen: data_rows.len(),
            rows_processed,
            rows_dropped,
        },
    }
}

/// Collapses NaN/null-ish tokens to an empty string so records serialize
/// cleanly to JSON (spec §4.4 step 4). Numeric/date cleaning proper happens
/// downstream in `ledgerflow-normalize`; this only removes the blanks that
/// would otherwise round-trip as the literal text `"nan"`/`"null"`.
fn sanitize(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
    {
        String::new()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(vals: &[&[&str]]) -> Vec<Vec<String>> {
        vals.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn auto_detects_header_row_and_builds_records() {
        let raw = rows(&[
            &["Date", "Amount", "Description"],
            &["2025-01-01", "-5.00", "Coffee"],
            &["2025-01-02", "10.00", "Refund"],
        ]);
        let processed = process(&raw, None);
        assert_eq!(processed.info.header_row, Some(0));
        assert_eq!(processed.info.rows_processed, 2);
        assert_eq!(processed.records[0]["Date"], "2025-01-01");
        assert_eq!(processed.records[1]["Amount"], "10.00");
    }

    #[test]
    fn explicit_header_row_overrides_autodetection() {
        let raw = rows(&[
            &["Statement export"],
            &["Date", "Amount"],
            &["2025-01-01", "1.00"],
        ]);
        let processed = process(&raw, Some(1));
        assert_eq!(processed.info.header_row, Some(1));
        assert_eq!(processed.records.len(), 1);
        assert_eq!(processed.records[0]["Date"], "2025-01-01");
    }

    #[test]
    fn blank_rows_are_dropped_and_counted() {
        let raw = rows(&[
            &["Date", "Amount"],
            &["2025-01-01", "1.00"],
            &["", ""],
            &["2025-01-02", "2.00"],
        ]);
        let processed = process(&raw, None);
        assert_eq!(processed.info.rows_dropped, 1);
        assert_eq!(processed.info.rows_processed, 2);
    }

    #[test]
    fn short_rows_fill_missing_cells_with_empty_string() {
        let raw = rows(&[&["Date", "Amount", "Note"], &["2025-01-01", "1.00"]]);
        let processed = process(&raw, None);
        assert_eq!(processed.records[0]["Note"], "");
    }

    #[test]
    fn nan_and_null_tokens_sanitize_to_empty_string() {
        let raw = rows(&[&["Date", "Note"], &["2025-01-01", "NaN"], &["2025-01-02", "null"]]);
        let processed = process(&raw, None);
        assert_eq!(processed.records[0]["Note"], "");
        assert_eq!(processed.records[1]["Note"], "");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let processed = process(&[], None);
        assert!(processed.records.is_empty());
        assert_eq!(processed.info.rows_seen, 0);
    }
}
