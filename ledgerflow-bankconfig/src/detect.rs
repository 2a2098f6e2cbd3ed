//! Bank detection: weighted filename/content/header scoring (spec §4.6).
//! Grounded on the substring-then-content-then-header shape of
//! `examples/other_examples/...finance-cli-src-parsers-detect.rs` and the
//! exact weighting formula of
//! `examples/original_source/backend/bank_detection/bank_detector.py`.

use regex::Regex;

use crate::types::BankConfig;

const FILENAME_WEIGHT: f64 = 0.2;
const CONTENT_WEIGHT: f64 = 0.4;
const HEADER_WEIGHT: f64 = 0.4;
pub const CONFIDENT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub bank: String,
    pub total_score: f64,
    pub filename_score: f64,
    pub content_score: f64,
    pub header_score: f64,
}

impl DetectionResult {
    #[must_use]
    pub fn is_confident(&self) -> bool {
        self.total_score >= CONFIDENT_THRESHOLD
    }
}

/// Scores every candidate bank against `filename`/`content_sample`/
/// `observed_headers` and returns the best-scoring match with `total > 0`,
/// or `None` if nothing matched at all.
pub fn detect_bank<'a>(
    banks: impl IntoIterator<Item = &'a BankConfig>,
    filename: &str,
    content_sample: &str,
    observed_headers: &[String],
) -> Option<DetectionResult> {
    let filename_lower = filename.to_lowercase();
    let content_lower = content_sample.to_lowercase();

    let mut best: Option<DetectionResult> = None;

    for bank in banks {
        let filename_score = filename_score(bank, &filename_lower);
        let content_score = content_score(bank, &content_lower);
        let header_score = header_score(bank, observed_headers);

        let weighted = filename_score * FILENAME_WEIGHT
            + content_score * CONTENT_WEIGHT
            + header_score * HEADER_WEIGHT;
        let total_score = weighted * bank.detection.confidence_weight;

        if total_score <= 0.0 {
            continue;
        }

        let candidate = DetectionResult {
            bank: bank.name.clone(),
            total_score,
            filename_score,
            content_score,
            header_score,
        };

        let replace = match &best {
            Some(current) => candidate.total_score > current.total_score,
            None => true,
        };
        if replace {
            best = Some(candidate);
        }
    }

    best
}

fn filename_score(bank: &BankConfig, filename_lower: &str) -> f64 {
    let mut score: f64 = 0.0;
    for pattern in &bank.detection.filename_substrings {
        if filename_lower.contains(&pattern.to_lowercase()) {
            score = score.max(1.0);
        }
    }
    for pattern in &bank.detection.filename_regexes {
        if let Ok(re) = Regex::new(pattern)
            && re.is_match(filename_lower)
        {
            score = score.max(1.0);
        }
    }
    score
}

fn content_score(bank: &BankConfig, content_lower: &str) -> f64 {
    let signatures = &bank.detection.content_signatures;
    if signatures.is_empty() {
        return 0.0;
    }
    let present = signatures
        .iter()
        .filter(|sig| content_lower.contains(&sig.to_lowercase()))
        .count();
    present as f64 / signatures.len() as f64
}

fn header_score(bank: &BankConfig, observed_headers: &[String]) -> f64 {
    let required = &bank.detection.expected_headers;
    if required.is_empty() {
        return 0.0;
    }
    let observed_lower: Vec<String> = observed_headers.iter().map(|h| h.to_lowercase()).collect();
    let present = required
        .iter()
        .filter(|expected| {
            let expected_lower = expected.to_lowercase();
            observed_lower
                .iter()
                .any(|observed| *observed == expected_lower || observed.contains(&expected_lower))
        })
        .count();
    present as f64 / required.len() as f64
}

/// Quick pre-parse detection from filename alone (spec §4.6 tie-break):
/// prefers the bank whose matching substring is the longest.
pub fn detect_bank_by_filename<'a>(
    banks: impl IntoIterator<Item = &'a BankConfig>,
    filename: &str,
) -> Option<&'a str> {
    let filename_lower = filename.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for bank in banks {
        for pattern in &bank.detection.filename_substrings {
            let pattern_lower = pattern.to_lowercase();
            if filename_lower.contains(&pattern_lower) {
                let len = pattern_lower.len();
                let replace = match best {
                    Some((_, best_len)) => len > best_len,
                    None => true,
                };
                if replace {
                    best = Some((bank.name.as_str(), len));
                }
            }
        }
    }

    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bank(name: &str, substrings: &[&str], signatures: &[&str], headers: &[&str], weight: f64) -> BankConfig {
        BankConfig {
            name: name.to_string(),
            detection: crate::types::DetectionConfig {
                filename_substrings: substrings.iter().map(|s| s.to_string()).collect(),
                filename_regexes: Vec::new(),
                content_signatures: signatures.iter().map(|s| s.to_string()).collect(),
                expected_headers: headers.iter().map(|s| s.to_string()).collect(),
                confidence_weight: weight,
            },
            ..Default::default()
        }
    }

    #[test]
    fn scores_by_weighted_filename_content_header() {
        let wise = bank("wise", &["wise"], &["exchange to amount"], &["TIMESTAMP", "AMOUNT"], 1.0);
        let chase = bank("chase", &["chase"], &["details,posting date"], &["Details", "Amount"], 1.0);
        let banks = vec![wise, chase];

        let result = detect_bank(
            &banks,
            "wise_statement_2025.csv",
            "exchange to amount 123 usd",
            &["TIMESTAMP".to_string(), "AMOUNT".to_string(), "DESCRIPTION".to_string()],
        )
        .expect("detects a bank");

        assert_eq!(result.bank, "wise");
        assert!(result.is_confident());
    }

    #[test]
    fn no_match_returns_none() {
        let banks = vec![bank("wise", &["wise"], &[], &[], 1.0)];
        let result = detect_bank(&banks, "random.csv", "", &[]);
        assert!(result.is_none());
    }

    #[test]
    fn confidence_weight_scales_total_score() {
        let low_weight = bank("low", &["bank"], &["bank"], &["Date"], 0.1);
        let banks = vec![low_weight];
        let result = detect_bank(&banks, "bank.csv", "bank", &["Date".to_string()]).expect("matches");
        assert!(!result.is_confident());
    }

    #[test]
    fn filename_tie_break_prefers_longest_substring() {
        let general = bank("bank-alfalah", &["bank"], &[], &[], 1.0);
        let specific = bank("bank-alfalah-premium", &["bank alfalah premium"], &[], &[], 1.0);
        let banks = vec![general, specific];
        let detected = detect_bank_by_filename(&banks, "bank alfalah premium export.csv");
        assert_eq!(detected, Some("bank-alfalah-premium"));
    }
}
