//! Description cleaning and conditional overrides (spec §4.7 steps 7–8).
//! Grounded on `data_cleaner.py`'s description-cleaning-rule application
//! and on the bank's `conditional_overrides` (spec §3 `ConditionalOverride`).

use regex::Regex;

use ledgerflow_bankconfig::ConditionalOverride;

use crate::error::NormalizeError;

/// Applies each rule in order: a rule containing `|` is a
/// `pattern|replacement` case-insensitive regex substitution; any other
/// rule is a case-insensitive literal removal. Whitespace is collapsed
/// after all rules run.
pub fn apply_description_cleaning(description: &str, rules: &[String]) -> Result<String, NormalizeError> {
    let mut text = description.to_string();

    for (index, rule) in rules.iter().enumerate() {
        if let Some((pattern, replacement)) = rule.split_once('|') {
            let regex = Regex::new(&format!("(?i){pattern}")).map_err(|source| NormalizeError::InvalidCleaningRegex {
                index,
                pattern: pattern.to_string(),
                source,
            })?;
            text = regex.replace_all(&text, replacement).into_owned();
        } else if rule.is_empty() {
            return Err(NormalizeError::InvalidCleaningRule {
                index,
                rule: rule.clone(),
            });
        } else {
            let regex = Regex::new(&format!("(?i){}", regex::escape(rule))).map_err(|source| {
                NormalizeError::InvalidCleaningRegex {
                    index,
                    pattern: rule.clone(),
                    source,
                }
            })?;
            text = regex.replace_all(&text, "").into_owned();
        }
    }

    Ok(collapse_whitespace(&text))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Applies the bank's conditional overrides in declaration order, stopping
/// at the first match (spec §4.7 step 8: "first match wins").
pub fn apply_conditional_overrides<'a>(
    overrides: &'a [ConditionalOverride],
    amount: f64,
    note: &str,
    description: &'a str,
) -> &'a str {
    for rule in overrides {
        if rule.matches(amount, note, description) {
            return &rule.set_description;
        }
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_rule_removes_case_insensitively() {
        let rules = vec!["card payment".to_string()];
        assert_eq!(
            apply_description_cleaning("CARD PAYMENT to Amazon", &rules).unwrap(),
            "to Amazon"
        );
    }

    #[test]
    fn pattern_replacement_rule_substitutes() {
        let rules = vec![r"TFR\s+\d+\|Transfer".to_string()];
        assert_eq!(apply_description_cleaning("TFR 98213 to savings", &rules).unwrap(), "Transfer to savings");
    }

    #[test]
    fn collapses_whitespace_left_by_removed_tokens() {
        let rules = vec!["POS".to_string()];
        assert_eq!(apply_description_cleaning("POS   Purchase   Shell Station", &rules).unwrap(), "Purchase Shell Station");
    }

    #[test]
    fn conditional_override_matches_first_applicable_rule() {
        let ride_hailing = ConditionalOverride {
            name: "ride_hailing".to_string(),
            if_amount_min: Some(-2000.0),
            if_amount_max: Some(-0.01),
            if_amount_less_than: None,
            if_amount_greater_than: None,
            if_amount_equals: None,
            if_note_equals: Some("Raast Out".to_string()),
            if_note_contains: None,
            if_description_contains: Some("Outgoing fund transfer to".to_string()),
            set_description: "Ride Hailing Services".to_string(),
        };
        let overrides = vec![ride_hailing];
        assert_eq!(
            apply_conditional_overrides(&overrides, -550.0, "Raast Out", "Outgoing fund transfer to XYZ"),
            "Ride Hailing Services"
        );
    }

    #[test]
    fn conditional_override_falls_through_when_no_rule_matches() {
        let overrides: Vec<ConditionalOverride> = vec![];
        assert_eq!(apply_conditional_overrides(&overrides, 10.0, "", "Coffee"), "Coffee");
    }
}
