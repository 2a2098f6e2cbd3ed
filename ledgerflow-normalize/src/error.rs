use thiserror::Error;

/// Errors fatal to a normalization run. Per-row problems (unparsable date,
/// unparsable amount) are warnings carried on [`crate::NormalizeOutcome`],
/// not `NormalizeError` values — see SPEC_FULL.md §4.0.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("description cleaning rule {index} is neither `pattern|replacement` nor a literal: {rule:?}")]
    InvalidCleaningRule { index: usize, rule: String },

    #[error("invalid regex in description cleaning rule {index} ({pattern:?}): {source}")]
    InvalidCleaningRegex {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid categorization pattern {pattern:?}: {source}")]
    InvalidCategorizationPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
