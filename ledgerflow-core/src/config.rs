use serde::Deserialize;
use serde::Serialize;

/// Global application configuration (`app.conf`), loaded once at startup.
///
/// Grounded on `codex-accounting-api::telemetry`'s env-driven
/// configuration-path resolution pattern, generalized to a full config
/// struct rather than a single path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name used to recognize the user in transfer-candidate patterns
    /// (e.g. "Sent money to {name}").
    pub user_display_name: String,
    /// Maximum allowed absolute difference, in hours, between the two
    /// members of a transfer pair.
    pub date_tolerance_hours: i64,
    /// Minimum confidence required to commit a transfer pair.
    pub confidence_threshold: f64,
    /// Category assigned to both members of a committed transfer pair.
    pub default_transfer_category: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_display_name: String::new(),
            date_tolerance_hours: 72,
            confidence_threshold: 0.7,
            default_transfer_category: "Balance Correction".to_string(),
        }
    }
}
