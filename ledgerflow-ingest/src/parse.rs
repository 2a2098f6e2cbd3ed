//! Multi-strategy CSV parsing with automatic fallback (spec §4.3).
//!
//! Strategy 1 and 2 are grounded on `codex-bank-ingest::CsvBankParser`'s
//! use of the `csv` crate; strategy 3's char-by-char state machine mirrors
//! `codex-bank-ingest::OfxBankParser`'s tag-parsing state machine, adapted
//! to delimiter/quote splitting instead of tag splitting.

use crate::dialect::DialectResult;
use crate::dialect::QuotingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingStrategy {
    LibraryCsv,
    StandardCsv,
    Manual,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub success: bool,
    pub raw_rows: Vec<Vec<String>>,
    pub strategy_used: ParsingStrategy,
    pub error: Option<String>,
}

/// Splits decoded content into lines on the detected line terminator,
/// trimming a leading BOM and any embedded NUL bytes per row (spec §4.3).
pub fn split_content_into_lines(content: &str, line_terminator: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let terminator = if line_terminator.is_empty() {
        "\n"
    } else {
        line_terminator
    };
    content
        .split(terminator)
        .map(|line| line.replace('\0', ""))
        .collect()
}

/// Parses `lines` into raw string rows, trying each strategy in order
/// until one succeeds. `max_rows`, if set, bounds how many data lines are
/// consumed (supports preview).
pub fn parse_with_fallback(
    lines: &[String],
    dialect: &DialectResult,
    max_rows: Option<usize>,
) -> ParseOutcome {
    let bounded: Vec<&String> = match max_rows {
        Some(n) => lines.iter().take(n).collect(),
        None => lines.iter().collect(),
    };

    match try_library_csv(&bounded, dialect) {
        Ok(rows) => {
            return ParseOutcome {
                success: true,
                raw_rows: rows,
                strategy_used: ParsingStrategy::LibraryCsv,
                error: None,
            };
        }
        Err(err) => tracing::debug!(error = %err, "library-csv strategy failed, trying standard-csv"),
    }

    match try_standard_csv(&bounded, dialect) {
        Ok(rows) => {
            return ParseOutcome {
                success: true,
                raw_rows: rows,
                strategy_used: ParsingStrategy::StandardCsv,
                error: None,
            };
        }
        Err(err) => tracing::debug!(error = %err, "standard-csv strategy failed, trying manual"),
    }

    match try_manual(&bounded, dialect) {
        Ok(rows) => ParseOutcome {
            success: true,
            raw_rows: rows,
            strategy_used: ParsingStrategy::Manual,
            error: None,
        },
        Err(err) => ParseOutcome {
            success: false,
            raw_rows: Vec::new(),
            strategy_used: ParsingStrategy::Manual,
            error: Some(err),
        },
    }
}

fn try_library_csv(lines: &[&String], dialect: &DialectResult) -> Result<Vec<Vec<String>>, String> {
    build_csv_reader(lines, dialect, false)
}

fn try_standard_csv(lines: &[&String], dialect: &DialectResult) -> Result<Vec<Vec<String>>, String> {
    build_csv_reader(lines, dialect, true)
}

fn build_csv_reader(
    lines: &[&String],
    dialect: &DialectResult,
    force_double_quote: bool,
) -> Result<Vec<Vec<String>>, String> {
    let joined = lines
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader_builder = csv::ReaderBuilder::new();
    reader_builder
        .delimiter(dialect.delimiter as u8)
        .quote(dialect.quotechar as u8)
        .has_headers(false)
        .flexible(true)
        .double_quote(force_double_quote || dialect.quoting == QuotingMode::All);

    let mut reader = reader_builder.from_reader(joined.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(
            record
                .iter()
                .map(|field| field.replace('\0', ""))
                .collect(),
        );
    }
    Ok(rows)
}

fn try_manual(lines: &[&String], dialect: &DialectResult) -> Result<Vec<Vec<String>>, String> {
    Ok(lines
        .iter()
        .map(|line| split_line(line, dialect.delimiter, dialect.quotechar))
        .collect())
}

/// Char-by-char state machine splitting a single line on `delimiter`,
/// honoring `quote`-delimited fields and doubled-quote escaping. Used by
/// the manual fallback strategy and by the structure analyzer, which needs
/// to split lines before a `DialectResult` confidence has been trusted
/// enough to hand off to the `csv` crate.
pub fn split_line(line: &str, delimiter: char, quote: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == quote {
                if chars.peek() == Some(&quote) {
                    current.push(quote);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == quote {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.replace('\0', "")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::QuotingMode;
    use pretty_assertions::assert_eq;

    fn fixture_dialect(quoting: QuotingMode) -> DialectResult {
        DialectResult {
            delimiter: ',',
            quotechar: '"',
            quoting,
            skipinitialspace: true,
            line_terminator: "\n".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn library_csv_strategy_parses_simple_rows() {
        let lines = vec!["Date,Amount,Description".to_string(), "2025-01-01,-5.00,Coffee".to_string()];
        let outcome = parse_with_fallback(&lines, &fixture_dialect(QuotingMode::Minimal), None);
        assert!(outcome.success);
        assert_eq!(outcome.strategy_used, ParsingStrategy::LibraryCsv);
        assert_eq!(outcome.raw_rows[1], vec!["2025-01-01", "-5.00", "Coffee"]);
    }

    #[test]
    fn quoted_field_with_embedded_delimiter_stays_one_field() {
        let lines = vec!["Date,Description,Amount".to_string(), "2025-01-01,\"Coffee, large\",-5.00".to_string()];
        let outcome = parse_with_fallback(&lines, &fixture_dialect(QuotingMode::Minimal), None);
        assert_eq!(outcome.raw_rows[1][1], "Coffee, large");
    }

    #[test]
    fn manual_split_line_handles_doubled_quote_escape() {
        let fields = split_line("\"Say \"\"hi\"\"\",5", ',', '"');
        assert_eq!(fields, vec!["Say \"hi\"", "5"]);
    }

    #[test]
    fn max_rows_bounds_parsed_output() {
        let lines = vec![
            "Date,Amount".to_string(),
            "2025-01-01,1".to_string(),
            "2025-01-02,2".to_string(),
            "2025-01-03,3".to_string(),
        ];
        let outcome = parse_with_fallback(&lines, &fixture_dialect(QuotingMode::Minimal), Some(2));
        assert_eq!(outcome.raw_rows.len(), 2);
    }
}
