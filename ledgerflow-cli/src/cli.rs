//! Clap command surface (spec §6): `preview`, `parse`, `transform`,
//! `detect-transfers`, `export`. Grounded on `cli/src/ledger_cmd.rs`'s
//! `OutputFormat`/subcommand-struct shape, adapted to a synchronous
//! `main` (SPEC_FULL.md §5).

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Debug, Parser)]
#[command(name = "ledgerflow", about = "Bank-statement CSV ingestion and transfer detection", version)]
pub struct LedgerflowCli {
    /// Directory holding bank `.conf` files and `app.conf`. Defaults to
    /// `LEDGERFLOW_CONFIG_DIR`, then the OS config directory.
    #[arg(long = "config-dir", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Path telemetry counters are persisted to. Counters are kept
    /// in-memory only (not persisted) if omitted.
    #[arg(long = "telemetry-file", global = true)]
    pub telemetry_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows encoding, dialect, header guess, and bank detection for a
    /// file without fully parsing it.
    Preview {
        path: PathBuf,
        #[arg(long)]
        encoding: Option<String>,
        #[arg(long = "header-row")]
        header_row: Option<usize>,
        #[arg(long = "max-rows", default_value_t = 20)]
        max_rows: usize,
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Parses one or more files into canonical rows, optionally running
    /// data cleaning into transactions.
    Parse {
        paths: Vec<PathBuf>,
        #[arg(long)]
        encoding: Option<String>,
        #[arg(long = "header-row")]
        header_row: Option<usize>,
        #[arg(long = "start-row")]
        start_row: Option<usize>,
        #[arg(long = "end-row")]
        end_row: Option<usize>,
        #[arg(long = "no-clean")]
        no_clean: bool,
        /// Requires a confident bank match for every file; exits 3 otherwise.
        #[arg(long)]
        strict: bool,
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Parses every file with cleaning enabled, then runs transfer
    /// detection across the combined transaction set.
    Transform {
        paths: Vec<PathBuf>,
        #[arg(long)]
        strict: bool,
        /// `outgoing_index:incoming_index` pairs to force-commit.
        #[arg(long = "manual-pair", value_name = "OUT:IN")]
        manual_pairs: Vec<String>,
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Writes the resulting ledger as CSV to this path.
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Runs transfer detection over an already-exported ledger CSV
    /// (columns: Date, Amount, Category, Title, Note, Account) without
    /// re-ingesting source bank files.
    DetectTransfers {
        path: PathBuf,
        #[arg(long = "manual-pair", value_name = "OUT:IN")]
        manual_pairs: Vec<String>,
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}
