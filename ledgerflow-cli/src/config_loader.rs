//! Config-directory resolution and `app.conf` loading (spec §5's
//! "ambient configuration" layer). Grounded on the `CODEX_HOME`
//! environment-override-then-OS-default convention used throughout the
//! teacher's config plumbing, generalized to this pipeline's
//! `LEDGERFLOW_CONFIG_DIR` variable and `dirs::config_dir()` fallback.

use std::path::Path;
use std::path::PathBuf;

use ledgerflow_bankconfig::conf::IniDocument;
use ledgerflow_core::AppConfig;

const CONFIG_DIR_ENV: &str = "LEDGERFLOW_CONFIG_DIR";
const GLOBAL_CONF: &str = "app.conf";

/// Resolves the directory bank `.conf` files and `app.conf` are read from:
/// an explicit `--config-dir` flag wins, then `LEDGERFLOW_CONFIG_DIR`,
/// then the OS config directory's `ledgerflow` subdirectory.
#[must_use]
pub fn resolve_config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("ledgerflow")
}

/// Loads `<dir>/app.conf`'s `[general]` section into an [`AppConfig`]. A
/// missing file is not an error: every field has a sensible default (spec
/// §5 "absence of `app.conf` is equivalent to an all-defaults config").
pub fn load_app_config(dir: &Path) -> AppConfig {
    let path = dir.join(GLOBAL_CONF);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };

    let doc = match IniDocument::parse(&path.display().to_string(), &text) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to parse app.conf; using defaults");
            return AppConfig::default();
        }
    };

    let Some(section) = doc.section("general") else {
        return AppConfig::default();
    };

    let defaults = AppConfig::default();
    AppConfig {
        user_display_name: section.get("user_display_name").map(str::to_string).unwrap_or(defaults.user_display_name),
        date_tolerance_hours: section
            .get("date_tolerance_hours")
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.date_tolerance_hours),
        confidence_threshold: section
            .get("confidence_threshold")
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.confidence_threshold),
        default_transfer_category: section
            .get("default_transfer_category")
            .map(str::to_string)
            .unwrap_or(defaults.default_transfer_category),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_app_conf_yields_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_app_config(dir.path());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn app_conf_overrides_are_applied() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("app.conf"),
            "[general]\nuser_display_name = Jordan\ndate_tolerance_hours = 48\nconfidence_threshold = 0.85\ndefault_transfer_category = Internal Transfer\n",
        )
        .expect("write app.conf");

        let config = load_app_config(dir.path());
        assert_eq!(config.user_display_name, "Jordan");
        assert_eq!(config.date_tolerance_hours, 48);
        assert!((config.confidence_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.default_transfer_category, "Internal Transfer");
    }

    #[test]
    fn malformed_app_conf_falls_back_to_defaults() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("app.conf"), "[general\nbroken").expect("write app.conf");
        let config = load_app_config(dir.path());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn explicit_dir_wins_over_env() {
        // SAFETY: test-only env mutation, no other test reads this var concurrently.
        unsafe { std::env::set_var(CONFIG_DIR_ENV, "/nonexistent-env-path") };
        let explicit = PathBuf::from("/explicit-path");
        let resolved = resolve_config_dir(Some(&explicit));
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
        assert_eq!(resolved, explicit);
    }
}
