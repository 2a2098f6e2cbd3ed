//! Keyword categorization (spec §4.7 step 9). Grounded on `data_cleaner.py`'s
//! category-rule matching, generalized per spec §9's "explicit matcher
//! instead of first-match string search": every pattern is tried, and on
//! multiple matches the longest pattern string wins, so a more specific
//! rule (`"Shell.*Petrol"`) beats a broader one (`"Shell"`).

use regex::Regex;

use crate::error::NormalizeError;

/// Categorizes `description` against the union of a bank's
/// `categorization_rules` and `default_category_rules`, both lists of
/// `(pattern, category)` pairs matched as case-insensitive word-boundary
/// regexes. Returns `None` when nothing matches.
pub fn categorize(
    description: &str,
    bank_rules: &[(String, String)],
    default_rules: &[(String, String)],
) -> Result<Option<String>, NormalizeError> {
    let mut best: Option<(usize, &str)> = None;

    for (pattern, category) in bank_rules.iter().chain(default_rules.iter()) {
        let regex = Regex::new(&format!(r"(?i)\b{pattern}\b")).map_err(|source| NormalizeError::InvalidCategorizationPattern {
            pattern: pattern.clone(),
            source,
        })?;
        if regex.is_match(description) {
            let candidate_len = pattern.len();
            match best {
                Some((len, _)) if len >= candidate_len => {}
                _ => best = Some((candidate_len, category.as_str())),
            }
        }
    }

    Ok(best.map(|(_, category)| category.to_string()))
}
