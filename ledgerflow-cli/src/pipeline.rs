//! Request-boundary facade (spec §6): `preview`, `parse`, `parse_many`,
//! `transform`, `detect_transfers_only`. Grounded on
//! `codex-accounting-api/src/facade.rs`'s shape of a single struct wrapping
//! the lower-level services, generalized to this pipeline's synchronous,
//! filesystem-driven operations (SPEC_FULL.md §5/§6).

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ledgerflow_bankconfig::BankConfig;
use ledgerflow_bankconfig::BankConfigRegistry;
use ledgerflow_core::AppConfig;
use ledgerflow_core::Transaction;
use ledgerflow_core::ensure_unique_indices;
use ledgerflow_ingest::EncodingResult;
use ledgerflow_ingest::ParsingStrategy;
use ledgerflow_ingest::decode_with;
use ledgerflow_ingest::dialect;
use ledgerflow_ingest::encoding;
use ledgerflow_ingest::parse;
use ledgerflow_ingest::process;
use ledgerflow_ingest::structure;
use ledgerflow_normalize::normalize;
use ledgerflow_transfers::ManualPair;
use ledgerflow_transfers::TransferOutcome;
use ledgerflow_transfers::detect_transfers;

use crate::error::CliError;
use crate::telemetry::PipelineTelemetry;

/// Range/behavior options for [`Pipeline::parse`] (spec §6 `parse`'s
/// `range_opts`).
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub start_col: Option<usize>,
    pub end_col: Option<usize>,
    pub encoding: Option<String>,
    pub header_row: Option<usize>,
    pub enable_cleaning: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BankInfo {
    pub detected: Option<String>,
    pub confidence: f64,
    pub confident: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleaningSummary {
    pub rows_seen: usize,
    pub rows_dropped: usize,
    pub warnings: Vec<String>,
    pub updated_column_mapping: HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileParseResult {
    pub path: String,
    pub success: bool,
    pub error: Option<String>,
    pub headers: Vec<String>,
    pub data: Vec<BTreeMap<String, String>>,
    pub row_count: usize,
    pub encoding_used: String,
    pub bank_info: BankInfo,
    pub cleaning_summary: Option<CleaningSummary>,
    #[serde(skip)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PreviewOutcome {
    pub preview_data: Vec<BTreeMap<String, String>>,
    pub headers: Vec<String>,
    pub total_rows: usize,
    pub encoding_used: String,
    pub bank_detection: BankInfo,
    pub parsing_info: ParsingInfo,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ParsingInfo {
    pub strategy_used: String,
    pub dialect_confidence: f64,
    pub has_headers: bool,
    pub suggested_header_row: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TransformSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_transactions: usize,
}

pub struct TransformResult {
    pub transformed_data: Vec<Transaction>,
    pub transfer_analysis: TransferOutcome,
    pub transformation_summary: TransformSummary,
    pub file_results: Vec<FileParseResult>,
}

/// Shared encoding/dialect/structure/raw-row analysis, reused by
/// `preview` and `parse` (spec §4.1–§4.3 run once per file regardless of
/// which request-boundary operation drives them).
struct FileAnalysis {
    encoding: EncodingResult,
    dialect: dialect::DialectResult,
    structure: structure::StructureAnalysis,
    raw_rows: Vec<Vec<String>>,
    strategy: ParsingStrategy,
}

fn analyze_file(bytes: &[u8], encoding_override: Option<&str>, max_rows: Option<usize>) -> FileAnalysis {
    let enc = match encoding_override {
        Some(name) => match decode_with(bytes, name) {
            Some(decoded) => EncodingResult {
                encoding: name.to_string(),
                confidence: 1.0,
                bom_detected: false,
                attempted_encodings: Vec::new(),
                decoded_sample: decoded,
            },
            None => {
                tracing::warn!(encoding = name, "caller-specified encoding could not decode file; auto-detecting");
                encoding::detect_encoding(bytes)
            }
        },
        None => encoding::detect_encoding(bytes),
    };

    let dialect_result = dialect::detect_dialect(&enc.decoded_sample, bytes, 10);
    let lines = parse::split_content_into_lines(&enc.decoded_sample, &dialect_result.line_terminator);
    let structure_analysis = structure::analyze(&enc, &dialect_result, &lines);
    let parse_outcome = parse::parse_with_fallback(&lines, &dialect_result, max_rows);

    FileAnalysis {
        encoding: enc,
        dialect: dialect_result,
        structure: structure_analysis,
        raw_rows: parse_outcome.raw_rows,
        strategy: parse_outcome.strategy_used,
    }
}

fn strategy_name(strategy: ParsingStrategy) -> &'static str {
    match strategy {
        ParsingStrategy::LibraryCsv => "library_csv",
        ParsingStrategy::StandardCsv => "standard_csv",
        ParsingStrategy::Manual => "manual",
    }
}

/// Resolves which raw row holds headers: an explicit caller override wins,
/// then a bank's configured `header_row` if it validates against the
/// bank's expected headers (spec §7 `HeaderValidationError` falls back to
/// auto-detection otherwise), then structure analysis' suggestion.
fn resolve_header_row(
    structure_analysis: &structure::StructureAnalysis,
    bank: Option<&BankConfig>,
    override_header_row: Option<usize>,
    raw_rows: &[Vec<String>],
) -> Option<usize> {
    if let Some(row) = override_header_row {
        return Some(row);
    }

    if let Some(bank) = bank
        && let Some(configured) = bank.csv_config.header_row
    {
        let idx = configured.saturating_sub(1);
        if idx < raw_rows.len() {
            if header_row_matches_expected(&raw_rows[idx], &bank.detection.expected_headers) {
                return Some(idx);
            }
            tracing::warn!(
                bank = %bank.name,
                configured_row = configured,
                "configured header_row did not match expected headers within tolerance; falling back to auto-detect"
            );
        } else {
            tracing::warn!(
                bank = %bank.name,
                configured_row = configured,
                file_rows = raw_rows.len(),
                "configured header_row is beyond file length; falling back to auto-detect"
            );
        }
    }

    structure_analysis.suggested_header_row
}

fn header_row_matches_expected(row: &[String], expected: &[String]) -> bool {
    if expected.is_empty() {
        return true;
    }
    let threshold = if expected.len() <= 3 { 1.0 } else { 0.5 };
    let observed_lower: Vec<String> = row.iter().map(|c| c.to_lowercase()).collect();
    let matched = expected
        .iter()
        .filter(|want| {
            let want_lower = want.to_lowercase();
            observed_lower.iter().any(|cell| *cell == want_lower || cell.contains(&want_lower))
        })
        .count();
    (matched as f64 / expected.len() as f64) >= threshold
}

pub struct Pipeline {
    registry: BankConfigRegistry,
    app_config: AppConfig,
    telemetry: Option<PipelineTelemetry>,
}

impl Pipeline {
    #[must_use]
    pub fn new(registry: BankConfigRegistry, app_config: AppConfig) -> Self {
        Self {
            registry,
            app_config,
            telemetry: None,
        }
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: PipelineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    #[must_use]
    pub fn app_config(&self) -> &AppConfig {
        &self.app_config
    }

    fn read(path: &Path) -> Result<Vec<u8>, CliError> {
        fs::read(path).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn detect_bank(&self, filename: &str, analysis: &FileAnalysis) -> BankInfo {
        let content_sample = analysis.structure.content_sample.join("\n");
        let detection = self.registry.detect_bank(filename, &content_sample, &analysis.structure.raw_headers);
        match detection {
            Some(result) => BankInfo {
                confident: result.is_confident(),
                confidence: result.total_score,
                detected: Some(result.bank),
            },
            None => BankInfo::default(),
        }
    }

    /// §6 `preview(path, encoding?, header_row?, max_rows)`.
    pub fn preview(
        &self,
        path: &Path,
        encoding_override: Option<&str>,
        header_row: Option<usize>,
        max_rows: usize,
    ) -> Result<PreviewOutcome, CliError> {
        let bytes = Self::read(path)?;
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let analysis = analyze_file(&bytes, encoding_override, Some(max_rows + header_row.map_or(1, |r| r + 1)));
        let bank_info = self.detect_bank(filename, &analysis);
        let bank = bank_info.detected.as_deref().and_then(|name| self.registry.get_config(name));

        let effective_header_row = resolve_header_row(&analysis.structure, bank.as_ref(), header_row, &analysis.raw_rows);
        let processed = process::process(&analysis.raw_rows, effective_header_row);

        let preview_data: Vec<BTreeMap<String, String>> = processed.records.into_iter().take(max_rows).collect();

        Ok(PreviewOutcome {
            total_rows: processed.info.rows_processed,
            preview_data,
            headers: processed.info.headers,
            encoding_used: analysis.encoding.encoding,
            bank_detection: bank_info,
            parsing_info: ParsingInfo {
                strategy_used: strategy_name(analysis.strategy).to_string(),
                dialect_confidence: analysis.dialect.confidence,
                has_headers: analysis.structure.has_headers,
                suggested_header_row: analysis.structure.suggested_header_row,
            },
        })
    }

    /// §6 `parse(path, range_opts)`. Returns `Err` only for the fatal
    /// cases in spec §7 (I/O failure, undetectable structure with headers
    /// required, every parsing strategy exhausted); per-row drops and
    /// `BankNotDetected` are non-fatal and recorded on the result.
    pub fn parse(&self, path: &Path, opts: &ParseOptions) -> Result<FileParseResult, CliError> {
        let bytes = Self::read(path)?;
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let path_display = path.display().to_string();

        let analysis = analyze_file(&bytes, opts.encoding.as_deref(), None);
        if !analysis.raw_rows.is_empty() && analysis.structure.suggested_header_row.is_none() && opts.header_row.is_none() {
            tracing::debug!(path = %path_display, "no headers detected; proceeding in headerless mode");
        }

        let bank_info = self.detect_bank(filename, &analysis);
        let bank = bank_info.detected.as_deref().and_then(|name| self.registry.get_config(name));
        if bank_info.detected.is_none() {
            tracing::warn!(path = %path_display, "no bank detected; using identity column mapping");
        }

        let effective_header_row = resolve_header_row(&analysis.structure, bank.as_ref(), opts.header_row, &analysis.raw_rows);
        let processed = process::process(&analysis.raw_rows, effective_header_row);

        let start_row = opts.start_row.unwrap_or(0);
        let end_row = opts.end_row.unwrap_or(processed.records.len());
        let windowed_rows: Vec<BTreeMap<String, String>> = processed
            .records
            .into_iter()
            .skip(start_row)
            .take(end_row.saturating_sub(start_row))
            .map(|record| project_columns(record, opts.start_col, opts.end_col, &processed.info.headers))
            .collect();

        let mut cleaning_summary = None;
        let mut transactions = Vec::new();
        if opts.enable_cleaning {
            let source_bank = bank_info.detected.clone().unwrap_or_else(|| derive_bank_key(filename));
            let outcome = normalize(&windowed_rows, bank.as_ref(), &source_bank, filename, 0)?;
            cleaning_summary = Some(CleaningSummary {
                rows_seen: outcome.rows_seen,
                rows_dropped: outcome.rows_dropped,
                warnings: outcome.warnings,
                updated_column_mapping: outcome.updated_column_mapping,
            });
            transactions = outcome.transactions;
        }

        Ok(FileParseResult {
            row_count: windowed_rows.len(),
            headers: processed.info.headers,
            data: windowed_rows,
            path: path_display,
            success: true,
            error: None,
            encoding_used: analysis.encoding.encoding,
            bank_info,
            cleaning_summary,
            transactions,
        })
    }

    /// §6 `parse_many(paths, configs, enable_cleaning)`. Always returns
    /// one result per input; a failing file never aborts the batch (spec
    /// §7: "the batch operation always returns").
    pub fn parse_many(&self, inputs: &[(std::path::PathBuf, ParseOptions)]) -> Vec<FileParseResult> {
        inputs
            .iter()
            .map(|(path, opts)| match self.parse(path, opts) {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "file failed during parse_many");
                    FileParseResult {
                        path: path.display().to_string(),
                        success: false,
                        error: Some(err.to_string()),
                        headers: Vec::new(),
                        data: Vec::new(),
                        row_count: 0,
                        encoding_used: String::new(),
                        bank_info: BankInfo::default(),
                        cleaning_summary: None,
                        transactions: Vec::new(),
                    }
                }
            })
            .collect()
    }

    /// §6 `transform(canonical_rows, csv_metadata, manual_pairs?)`. Takes
    /// already-parsed files (with cleaning enabled), reindexes every row
    /// to a session-unique `transaction_index` in deterministic
    /// bank+filename+row order (spec §5 "a deterministic bank+filename+row
    /// ordering is imposed before transfer-detection begins"), then runs
    /// the transfer detection engine across the union.
    pub fn transform(&self, files: &[FileParseResult], manual_pairs: &[ManualPair]) -> Result<TransformResult, CliError> {
        let mut ordered_files: Vec<&FileParseResult> = files.iter().filter(|f| f.success).collect();
        ordered_files.sort_by(|a, b| {
            let bank_a = a.bank_info.detected.as_deref().unwrap_or("");
            let bank_b = b.bank_info.detected.as_deref().unwrap_or("");
            bank_a.cmp(bank_b).then_with(|| a.path.cmp(&b.path))
        });

        let mut transactions = Vec::new();
        let mut next_index = 0u64;
        for file in &ordered_files {
            for txn in &file.transactions {
                let mut txn = txn.clone();
                txn.transaction_index = next_index;
                next_index += 1;
                transactions.push(txn);
            }
        }
        ensure_unique_indices(&transactions)?;

        let transfer_analysis = detect_transfers(&transactions, &self.app_config, manual_pairs)?;

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_batch(files, &transfer_analysis);
        }

        let summary = TransformSummary {
            files_processed: files.iter().filter(|f| f.success).count(),
            files_failed: files.iter().filter(|f| !f.success).count(),
            total_transactions: transfer_analysis.transactions.len(),
        };

        Ok(TransformResult {
            transformed_data: transfer_analysis.transactions.clone(),
            transfer_analysis,
            transformation_summary: summary,
            file_results: files.to_vec(),
        })
    }

    /// §6 `detect_transfers_only(transformed_rows, metadata)` — runs the
    /// engine directly over already-normalized rows without re-ingesting
    /// any files.
    pub fn detect_transfers_only(&self, transactions: &[Transaction], manual_pairs: &[ManualPair]) -> Result<TransferOutcome, CliError> {
        Ok(detect_transfers(transactions, &self.app_config, manual_pairs)?)
    }
}

/// Derives a fallback `source_bank` key from a filename when no bank was
/// detected, matching the account-resolution fallback's title-casing
/// convention (spec §4.7 "Account resolution").
fn derive_bank_key(filename: &str) -> String {
    let stem = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    stem.to_lowercase()
}

fn project_columns(
    record: BTreeMap<String, String>,
    start_col: Option<usize>,
    end_col: Option<usize>,
    headers: &[String],
) -> BTreeMap<String, String> {
    let (Some(start), Some(end)) = (start_col, end_col) else {
        return record;
    };
    let allowed: std::collections::HashSet<&str> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx >= start && *idx < end)
        .map(|(_, name)| name.as_str())
        .collect();
    record.into_iter().filter(|(key, _)| allowed.contains(key.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const SAMPLE_CSV: &str = "Date,Amount,Description\n2024-03-01,-12.50,Coffee Shop\n2024-03-02,1000.00,Salary\n";

    fn pipeline_with_empty_registry() -> Pipeline {
        let dir = TempDir::new().expect("tempdir");
        let registry = BankConfigRegistry::load_dir(dir.path()).expect("load empty dir");
        Pipeline::new(registry, AppConfig::default())
    }

    fn write_sample(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, SAMPLE_CSV).expect("write fixture");
        path
    }

    #[test]
    fn preview_reports_headers_and_row_count_without_bank_config() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_sample(&dir, "statement.csv");
        let pipeline = pipeline_with_empty_registry();

        let outcome = pipeline.preview(&path, None, None, 10).expect("preview succeeds");

        assert_eq!(outcome.headers, vec!["Date", "Amount", "Description"]);
        assert_eq!(outcome.total_rows, 2);
        assert!(outcome.bank_detection.detected.is_none());
    }

    #[test]
    fn parse_with_cleaning_produces_transactions_with_identity_mapping() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_sample(&dir, "statement.csv");
        let pipeline = pipeline_with_empty_registry();

        let opts = ParseOptions {
            enable_cleaning: true,
            ..ParseOptions::default()
        };
        let result = pipeline.parse(&path, &opts).expect("parse succeeds");

        assert!(result.success);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[0].amount, -12.5);
    }

    #[test]
    fn parse_many_never_aborts_the_batch_on_a_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let good = write_sample(&dir, "statement.csv");
        let missing = dir.path().join("does-not-exist.csv");
        let pipeline = pipeline_with_empty_registry();

        let inputs = vec![(good, ParseOptions::default()), (missing, ParseOptions::default())];
        let results = pipeline.parse_many(&inputs);

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
    }

    #[test]
    fn transform_reindexes_transactions_and_runs_transfer_detection() {
        let dir = TempDir::new().expect("tempdir");
        let path_a = write_sample(&dir, "a_statement.csv");
        let pipeline = pipeline_with_empty_registry();

        let opts = ParseOptions {
            enable_cleaning: true,
            ..ParseOptions::default()
        };
        let parsed = pipeline.parse(&path_a, &opts).expect("parse succeeds");

        let transform_result = pipeline.transform(&[parsed], &[]).expect("transform succeeds");

        assert_eq!(transform_result.transformation_summary.total_transactions, 2);
        let indices: Vec<u64> = transform_result.transformed_data.iter().map(|txn| txn.transaction_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }
}
