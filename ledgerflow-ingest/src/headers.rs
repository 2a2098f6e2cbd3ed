//! Shared header-row scoring used by both the structure analyzer (§4.5)
//! and the data processor (§4.4).

/// Finance-domain keyword sets, lower-cased. At minimum English is
/// covered; a handful of other locales observed among bank exports are
/// included per spec §4.5's "multilingual" requirement.
const FINANCE_KEYWORDS: &[&str] = &[
    // English
    "date", "timestamp", "amount", "balance", "description", "type", "transaction", "currency",
    "reference", "memo", "note",
    // German (common among European bank exports)
    "datum", "betrag", "saldo", "beschreibung", "währung", "buchungstext", "verwendungszweck",
    // Spanish
    "fecha", "monto", "saldo", "descripcion", "descripción", "moneda", "referencia",
];

/// Scores a candidate header row: 2 points per cell containing any finance
/// keyword, 1 point per non-numeric cell (spec §4.4 step 2).
pub fn score_row(cells: &[String]) -> i64 {
    let mut score = 0i64;
    for cell in cells {
        let lower = cell.to_lowercase();
        if FINANCE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            score += 2;
        }
        if cell.trim().parse::<f64>().is_err() {
            score += 1;
        }
    }
    score
}

/// Picks the best-scoring row among the first `limit` rows. Returns
/// `None` if `rows` is empty.
pub fn best_header_row(rows: &[Vec<String>], limit: usize) -> Option<usize> {
    rows.iter()
        .take(limit)
        .enumerate()
        .max_by_key(|(_, row)| score_row(row))
        .map(|(idx, _)| idx)
}

/// Replaces blank header cells with `Column_{1-indexed position}`.
pub fn fill_blank_headers(cells: Vec<String>) -> Vec<String> {
    cells
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            if cell.trim().is_empty() {
                format!("Column_{}", idx + 1)
            } else {
                cell
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_like_row_outscores_numeric_row() {
        let header = vec!["Date".to_string(), "Amount".to_string(), "Description".to_string()];
        let numeric = vec!["2025-01-01".to_string(), "-5.00".to_string(), "Coffee".to_string()];
        assert!(score_row(&header) > score_row(&numeric));
    }

    #[test]
    fn blank_headers_are_replaced_positionally() {
        let cells = vec!["Date".to_string(), String::new(), "Amount".to_string()];
        let filled = fill_blank_headers(cells);
        assert_eq!(filled, vec!["Date", "Column_2", "Amount"]);
    }
}
