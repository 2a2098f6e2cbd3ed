//! Hand-rolled INI-style parser for `.conf` files (spec §6). No INI crate
//! is fabricated for this: the format is a small, explicit subset (section
//! headers, `key = value` pairs, `#`/`;` comments, comma-separated lists
//! for multi-valued keys) and a line scanner in the plain-data-parsing
//! style of `codex-bank-ingest`'s `CsvIndexes`/`find_index` helpers reads
//! it more clearly than onboarding a dependency the rest of the corpus
//! never uses.

use crate::error::BankConfigError;

#[derive(Debug, Clone)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Splits a comma-separated value into trimmed, non-empty items.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    pub sections: Vec<IniSection>,
}

impl IniDocument {
    /// Parses `text` (the contents of the `.conf` file at `path`, used only
    /// for error messages).
    pub fn parse(path: &str, text: &str) -> Result<Self, BankConfigError> {
        let mut sections: Vec<IniSection> = Vec::new();
        let mut current: Option<IniSection> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(stripped) = line.strip_prefix('[') {
                let name = stripped.strip_suffix(']').ok_or_else(|| BankConfigError::MalformedLine {
                    path: path.to_string(),
                    line_no,
                    line: raw_line.to_string(),
                })?;
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                current = Some(IniSection {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(BankConfigError::MalformedLine {
                    path: path.to_string(),
                    line_no,
                    line: raw_line.to_string(),
                });
            };

            let section = current.as_mut().ok_or_else(|| BankConfigError::MalformedLine {
                path: path.to_string(),
                line_no,
                line: raw_line.to_string(),
            })?;
            section
                .entries
                .push((key.trim().to_string(), value.trim().to_string()));
        }

        if let Some(section) = current.take() {
            sections.push(section);
        }

        Ok(Self { sections })
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All sections whose name starts with `prefix`, in file order — used
    /// for `conditional_override_*` which is one section per rule.
    pub fn sections_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a IniSection> {
        self.sections.iter().filter(move |s| s.name.starts_with(prefix))
    }
}
