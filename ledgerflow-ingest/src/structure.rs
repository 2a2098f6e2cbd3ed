//! Structure analyzer: header-row location and content sampling (spec
//! §4.5), bank-agnostic.

use crate::dialect::DialectResult;
use crate::encoding::EncodingResult;
use crate::headers;
use crate::parse::split_line;

#[derive(Debug, Clone)]
pub struct StructureAnalysis {
    pub encoding: String,
    pub dialect: DialectResult,
    pub suggested_header_row: Option<usize>,
    pub suggested_data_start_row: usize,
    pub raw_headers: Vec<String>,
    /// Up to 15 pre-header rows + the header row + 5 post-header rows.
    pub content_sample: Vec<String>,
    pub has_headers: bool,
    pub confidence: f64,
}

/// Runs header-row detection over `lines`, already split by the detected
/// line terminator but not yet split into fields.
pub fn analyze(
    encoding: &EncodingResult,
    dialect: &DialectResult,
    lines: &[String],
) -> StructureAnalysis {
    if lines.is_empty() {
        return StructureAnalysis {
            encoding: encoding.encoding.clone(),
            dialect: dialect.clone(),
            suggested_header_row: None,
            suggested_data_start_row: 0,
            raw_headers: Vec::new(),
            content_sample: Vec::new(),
            has_headers: false,
            confidence: encoding.confidence,
        };
    }

    let split_rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| split_line(line, dialect.delimiter, dialect.quotechar))
        .collect();

    let header_row = headers::best_header_row(&split_rows, 5).filter(|&idx| {
        // Spec §4.5: headerless files produce no suggested header row.
        // Treat a non-positive score as "no header detected" rather than
        // always picking row 0.
        headers::score_row(&split_rows[idx]) > 0
    });

    let (has_headers, suggested_header_row, suggested_data_start_row, raw_headers) =
        match header_row {
            Some(idx) => (
                true,
                Some(idx),
                idx + 1,
                headers::fill_blank_headers(split_rows[idx].clone()),
            ),
            None => {
                let width = split_rows.first().map_or(0, Vec::len);
                (
                    false,
                    None,
                    0,
                    (1..=width).map(|n| format!("Column_{n}")).collect(),
                )
            }
        };

    let pre_start = suggested_header_row.map_or(0, |idx| idx.saturating_sub(15));
    let post_end = (suggested_data_start_row + 5).min(lines.len());
    let content_sample = lines[pre_start..post_end].to_vec();

    StructureAnalysis {
        encoding: encoding.encoding.clone(),
        dialect: dialect.clone(),
        suggested_header_row,
        suggested_data_start_row,
        raw_headers,
        content_sample,
        has_headers,
        confidence: dialect.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::QuotingMode;
    use pretty_assertions::assert_eq;

    fn fixture_dialect() -> DialectResult {
        DialectResult {
            delimiter: ',',
            quotechar: '"',
            quoting: QuotingMode::Minimal,
            skipinitialspace: true,
            line_terminator: "\n".to_string(),
            confidence: 0.9,
        }
    }

    fn fixture_encoding() -> EncodingResult {
        EncodingResult {
            encoding: "utf-8".to_string(),
            confidence: 0.9,
            bom_detected: false,
            attempted_encodings: Vec::new(),
            decoded_sample: String::new(),
        }
    }

    #[test]
    fn locates_header_row_among_pre_amble_lines() {
        let lines: Vec<String> = vec![
            "Statement export".to_string(),
            "Generated 2025-01-01".to_string(),
            "Date,Amount,Description".to_string(),
            "2025-01-01,-5.00,Coffee".to_string(),
        ];
        let analysis = analyze(&fixture_encoding(), &fixture_dialect(), &lines);
        assert!(analysis.has_headers);
        assert_eq!(analysis.suggested_header_row, Some(2));
        assert_eq!(analysis.suggested_data_start_row, 3);
        assert_eq!(analysis.raw_headers, vec!["Date", "Amount", "Description"]);
    }

    #[test]
    fn headerless_file_has_no_suggested_header_row() {
        let lines: Vec<String> = vec![
            "2025-01-01,-5.00,Coffee".to_string(),
            "2025-01-02,10.00,Refund".to_string(),
        ];
        let analysis = analyze(&fixture_encoding(), &fixture_dialect(), &lines);
        assert!(!analysis.has_headers);
        assert_eq!(analysis.suggested_header_row, None);
        assert_eq!(analysis.suggested_data_start_row, 0);
        assert_eq!(analysis.raw_headers, vec!["Column_1", "Column_2", "Column_3"]);
    }

    #[test]
    fn empty_input_is_handled() {
        let analysis = analyze(&fixture_encoding(), &fixture_dialect(), &[]);
        assert!(!analysis.has_headers);
        assert!(analysis.content_sample.is_empty());
    }
}
