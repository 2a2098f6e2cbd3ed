use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: malformed INI line {line_no}: {line}")]
    MalformedLine {
        path: String,
        line_no: usize,
        line: String,
    },

    #[error("{path}: bank_info section is missing a required key `{key}`")]
    MissingKey { path: String, key: String },

    #[error("{path}: invalid regex `{pattern}` in {context}: {source}")]
    InvalidRegex {
        path: String,
        pattern: String,
        context: String,
        #[source]
        source: regex::Error,
    },

    #[error("{path}: conditional override section `{section}` has an unparseable numeric value for `{key}`: {value}")]
    InvalidOverrideValue {
        path: String,
        section: String,
        key: String,
        value: String,
    },

    #[error("unknown bank family `{0}` referenced from bank_info.family")]
    UnknownFamily(String),
}
