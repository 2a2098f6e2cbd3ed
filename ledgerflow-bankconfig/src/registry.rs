//! Config registry: loads every bank `.conf` file in a directory once at
//! startup and serves immutable snapshots (spec §5 "bank config registry
//! is immutable per request; reloads use copy-on-write swap"). Grounded on
//! `codex-policy`'s registry-of-rules pattern (`Arc`-shared snapshot,
//! atomic swap on reload, in-flight callers keep the snapshot they started
//! with because `Arc::clone` is cheap and independent of later swaps).

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;

use crate::detect::DetectionResult;
use crate::detect::detect_bank;
use crate::error::BankConfigError;
use crate::loader::load_bank_config;
use crate::types::BankConfig;

const FAMILY_SUFFIX: &str = "_family.conf";
const GLOBAL_CONF: &str = "app.conf";

#[derive(Debug, Default)]
struct Snapshot {
    banks: HashMap<String, BankConfig>,
}

#[derive(Clone)]
pub struct BankConfigRegistry {
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
}

impl BankConfigRegistry {
    /// An empty registry: no banks ever detected, every lookup returns
    /// `None`. Used as a fallback when no config directory exists rather
    /// than treating a fresh install as fatal.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(Snapshot::default()))),
        }
    }

    /// Loads every `<name>.conf` in `dir` (excluding `app.conf`), resolving
    /// `*_family.conf` inheritance first so bank files can reference a
    /// family by name (spec §9's explicit family-chain redesign).
    pub fn load_dir(dir: &Path) -> Result<Self, BankConfigError> {
        let snapshot = build_snapshot(dir)?;
        Ok(Self {
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        })
    }

    /// Rebuilds the registry from `dir` and atomically swaps the snapshot.
    /// Callers holding an earlier `get_config`/`detect_bank` result (or a
    /// registry clone obtained before this call) are unaffected.
    pub fn reload(&self, dir: &Path) -> Result<(), BankConfigError> {
        let snapshot = build_snapshot(dir)?;
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(snapshot);
        Ok(())
    }

    #[must_use]
    pub fn list_banks(&self) -> Vec<String> {
        let snapshot = self.current();
        let mut names: Vec<String> = snapshot.banks.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn get_config(&self, name: &str) -> Option<BankConfig> {
        self.current().banks.get(name).cloned()
    }

    #[must_use]
    pub fn detect_bank(
        &self,
        filename: &str,
        content_sample: &str,
        observed_headers: &[String],
    ) -> Option<DetectionResult> {
        let snapshot = self.current();
        detect_bank(snapshot.banks.values(), filename, content_sample, observed_headers)
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(
            &self
                .snapshot
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }
}

fn build_snapshot(dir: &Path) -> Result<Snapshot, BankConfigError> {
    let mut families: HashMap<String, BankConfig> = HashMap::new();
    let mut bank_texts: Vec<(String, String, String)> = Vec::new(); // (path, stem, text)

    let entries = fs::read_dir(dir).map_err(|source| BankConfigError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| BankConfigError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".conf") || file_name == GLOBAL_CONF {
            continue;
        }

        let text = fs::read_to_string(&path).map_err(|source| BankConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if let Some(family_name) = file_name.strip_suffix(FAMILY_SUFFIX) {
            let config = load_bank_config(&path.display().to_string(), &text)?;
            families.insert(family_name.to_string(), config);
        } else {
            bank_texts.push((path.display().to_string(), file_name.to_string(), text));
        }
    }

    let mut banks = HashMap::new();
    for (path, _, text) in bank_texts {
        let mut config = load_bank_config(&path, &text)?;
        if let Some(family_name) = config.family.clone() {
            let family = families
                .get(&family_name)
                .ok_or_else(|| BankConfigError::UnknownFamily(family_name.clone()))?;
            config = config.with_family_fallback(family);
        }
        banks.insert(config.name.clone(), config);
    }

    Ok(Snapshot { banks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write fixture");
    }

    #[test]
    fn loads_bank_configs_from_directory() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "chase.conf",
            "[bank_info]\nname = chase\nprimary_currency = USD\n\n[detection]\nfilename_substrings = chase\n",
        );
        write(
            dir.path(),
            "app.conf",
            "[general]\nuser_display_name = Test User\n",
        );

        let registry = BankConfigRegistry::load_dir(dir.path()).expect("loads");
        assert_eq!(registry.list_banks(), vec!["chase".to_string()]);
        assert!(registry.get_config("chase").is_some());
        assert!(registry.get_config("app").is_none());
    }

    #[test]
    fn family_conf_is_inherited_by_referencing_banks() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "wise_family.conf",
            "[bank_info]\nname = wise\n\n[column_mapping]\nAmount = AMOUNT\n",
        );
        write(
            dir.path(),
            "wise-usd.conf",
            "[bank_info]\nname = wise-usd\nfamily = wise\nprimary_currency = USD\n\n[column_mapping]\nDate = TIMESTAMP\n",
        );

        let registry = BankConfigRegistry::load_dir(dir.path()).expect("loads");
        let config = registry.get_config("wise-usd").expect("bank present");
        assert_eq!(config.column_mapping.get("Date").unwrap(), "TIMESTAMP");
        assert_eq!(config.column_mapping.get("Amount").unwrap(), "AMOUNT");
        assert!(registry.get_config("wise").is_none());
    }

    #[test]
    fn unknown_family_reference_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "bank.conf",
            "[bank_info]\nname = bank\nfamily = ghost\n",
        );
        let err = BankConfigRegistry::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, BankConfigError::UnknownFamily(_)));
    }

    #[test]
    fn reload_swaps_snapshot_without_affecting_prior_clone() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "chase.conf", "[bank_info]\nname = chase\n");

        let registry = BankConfigRegistry::load_dir(dir.path()).expect("loads");
        let before = registry.get_config("chase");
        assert!(before.is_some());

        write(dir.path(), "discover.conf", "[bank_info]\nname = discover\n");
        registry.reload(dir.path()).expect("reloads");

        assert!(registry.get_config("discover").is_some());
        assert!(registry.get_config("chase").is_some());
    }
}
