//! Bank configuration model, `.conf` loader, and content/filename/header
//! bank detector (spec §4.6, §6). Depends only on `regex`; nothing in this
//! crate knows how a CSV was parsed — it consumes headers and a content
//! sample produced by `ledgerflow-ingest`.

pub mod conf;
pub mod detect;
mod error;
pub mod loader;
pub mod registry;
pub mod types;

pub use detect::CONFIDENT_THRESHOLD;
pub use detect::DetectionResult;
pub use detect::detect_bank;
pub use detect::detect_bank_by_filename;
pub use error::BankConfigError;
pub use loader::load_bank_config;
pub use registry::BankConfigRegistry;
pub use types::BankConfig;
pub use types::ConditionalOverride;
pub use types::CsvConfig;
pub use types::DataCleaningConfig;
pub use types::DetectionConfig;
