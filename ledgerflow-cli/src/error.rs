use thiserror::Error;

/// Errors fatal at the orchestration boundary (spec §7): file-not-found,
/// I/O failure, and the three cases upstream crates treat as fatal to a
/// single file (`StructureError`, `ParsingError`, and config-loading
/// failures). Per-row and per-file-but-non-fatal problems are captured as
/// data on the result structs in [`crate::pipeline`], not here.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no headers detectable in {path} and headers were required")]
    Structure { path: String },

    #[error("all parsing strategies failed for {path}: {source}")]
    Parsing { path: String, source: String },

    #[error(transparent)]
    BankConfig(#[from] ledgerflow_bankconfig::BankConfigError),

    #[error(transparent)]
    Normalize(#[from] ledgerflow_normalize::NormalizeError),

    #[error(transparent)]
    Transfer(#[from] ledgerflow_transfers::TransferError),

    #[error(transparent)]
    Core(#[from] ledgerflow_core::CoreError),

    #[error("no bank detected at confidence >= {0:.2} and strict mode is enabled")]
    BankNotDetectedStrict(f64),

    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
}
