//! Command-line entry point (spec §6). Synchronous throughout: every
//! operation here is file-bound and CPU-bound, so unlike the teacher's
//! `async` ledger CLI this one has no need for a runtime.

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use ledgerflow_bankconfig::BankConfigRegistry;
use ledgerflow_cli::cli::Command;
use ledgerflow_cli::cli::LedgerflowCli;
use ledgerflow_cli::cli::OutputFormat;
use ledgerflow_cli::config_loader;
use ledgerflow_cli::export;
use ledgerflow_cli::pipeline::ParseOptions;
use ledgerflow_cli::telemetry::PipelineTelemetry;
use ledgerflow_cli::CliError;
use ledgerflow_cli::Pipeline;
use ledgerflow_transfers::ManualPair;

const EXIT_SUCCESS: u8 = 0;
const EXIT_BAD_INPUT: u8 = 2;
const EXIT_BANK_NOT_DETECTED: u8 = 3;
const EXIT_IO_FAILURE: u8 = 5;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let cli = LedgerflowCli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &CliError) -> u8 {
    match err {
        CliError::Io { .. } => EXIT_IO_FAILURE,
        CliError::BankNotDetectedStrict(_) => EXIT_BANK_NOT_DETECTED,
        CliError::Structure { .. } | CliError::Parsing { .. } | CliError::Normalize(_) | CliError::Export(_) => EXIT_BAD_INPUT,
        CliError::BankConfig(_) | CliError::Transfer(_) | CliError::Core(_) => EXIT_BAD_INPUT,
    }
}

fn build_pipeline(cli: &LedgerflowCli) -> Result<Pipeline, CliError> {
    let config_dir = config_loader::resolve_config_dir(cli.config_dir.as_deref());
    let registry = if config_dir.is_dir() {
        BankConfigRegistry::load_dir(&config_dir)?
    } else {
        tracing::warn!(dir = %config_dir.display(), "config directory not found; no banks will be detected");
        BankConfigRegistry::empty()
    };
    let app_config = config_loader::load_app_config(&config_dir);

    let telemetry = PipelineTelemetry::load(cli.telemetry_file.clone());
    Ok(Pipeline::new(registry, app_config).with_telemetry(telemetry))
}

fn parse_manual_pairs(raw: &[String]) -> Result<Vec<ManualPair>, CliError> {
    raw.iter()
        .map(|entry| {
            let (out, incoming) = entry.split_once(':').ok_or_else(|| CliError::Parsing {
                path: "<manual-pair>".to_string(),
                source: format!("expected OUT:IN, got {entry:?}"),
            })?;
            let outgoing_index = out.trim().parse().map_err(|_| CliError::Parsing {
                path: "<manual-pair>".to_string(),
                source: format!("invalid outgoing index in {entry:?}"),
            })?;
            let incoming_index = incoming.trim().parse().map_err(|_| CliError::Parsing {
                path: "<manual-pair>".to_string(),
                source: format!("invalid incoming index in {entry:?}"),
            })?;
            Ok(ManualPair {
                outgoing_index,
                incoming_index,
            })
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("{{\"error\": \"{err}\"}}"));
    println!("{text}");
    Ok(())
}

fn run(cli: LedgerflowCli) -> Result<u8, CliError> {
    match &cli.command {
        Command::Preview {
            path,
            encoding,
            header_row,
            max_rows,
            format,
        } => run_preview(&cli, path, encoding.as_deref(), *header_row, *max_rows, *format),
        Command::Parse {
            paths,
            encoding,
            header_row,
            start_row,
            end_row,
            no_clean,
            strict,
            format,
        } => run_parse(&cli, paths, encoding.as_deref(), *header_row, *start_row, *end_row, *no_clean, *strict, *format),
        Command::Transform {
            paths,
            strict,
            manual_pairs,
            format,
            export: export_path,
        } => run_transform(&cli, paths, *strict, manual_pairs, *format, export_path.as_deref()),
        Command::DetectTransfers {
            path,
            manual_pairs,
            format,
        } => run_detect_transfers(&cli, path, manual_pairs, *format),
    }
}

fn run_preview(
    cli: &LedgerflowCli,
    path: &Path,
    encoding: Option<&str>,
    header_row: Option<usize>,
    max_rows: usize,
    format: OutputFormat,
) -> Result<u8, CliError> {
    let pipeline = build_pipeline(cli)?;
    let outcome = pipeline.preview(path, encoding, header_row, max_rows)?;

    if format.is_json() {
        print_json(&outcome)?;
    } else {
        println!("encoding: {}", outcome.encoding_used);
        println!("strategy: {}", outcome.parsing_info.strategy_used);
        println!("headers: {}", outcome.headers.join(", "));
        println!("total rows: {}", outcome.total_rows);
        match &outcome.bank_detection.detected {
            Some(bank) => println!("bank: {bank} (confidence {:.2}, confident={})", outcome.bank_detection.confidence, outcome.bank_detection.confident),
            None => println!("bank: <undetected>"),
        }
        for (idx, row) in outcome.preview_data.iter().enumerate() {
            println!("row {idx}: {row:?}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[allow(clippy::too_many_arguments)]
fn run_parse(
    cli: &LedgerflowCli,
    paths: &[std::path::PathBuf],
    encoding: Option<&str>,
    header_row: Option<usize>,
    start_row: Option<usize>,
    end_row: Option<usize>,
    no_clean: bool,
    strict: bool,
    format: OutputFormat,
) -> Result<u8, CliError> {
    let pipeline = build_pipeline(cli)?;
    let opts = ParseOptions {
        start_row,
        end_row,
        start_col: None,
        end_col: None,
        encoding: encoding.map(str::to_string),
        header_row,
        enable_cleaning: !no_clean,
    };

    let inputs: Vec<(std::path::PathBuf, ParseOptions)> = paths.iter().cloned().map(|path| (path, opts.clone())).collect();
    let results = pipeline.parse_many(&inputs);

    if strict {
        for result in &results {
            if result.success && result.bank_info.detected.is_none() {
                return Err(CliError::BankNotDetectedStrict(pipeline.app_config().confidence_threshold));
            }
        }
    }

    if format.is_json() {
        print_json(&results)?;
    } else {
        for result in &results {
            if result.success {
                println!("{}: {} rows, bank={:?}", result.path, result.row_count, result.bank_info.detected);
            } else {
                println!("{}: FAILED ({})", result.path, result.error.as_deref().unwrap_or("unknown error"));
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

fn run_transform(
    cli: &LedgerflowCli,
    paths: &[std::path::PathBuf],
    strict: bool,
    manual_pairs: &[String],
    format: OutputFormat,
    export_path: Option<&Path>,
) -> Result<u8, CliError> {
    let pipeline = build_pipeline(cli)?;
    let opts = ParseOptions {
        enable_cleaning: true,
        ..ParseOptions::default()
    };
    let inputs: Vec<(std::path::PathBuf, ParseOptions)> = paths.iter().cloned().map(|path| (path, opts.clone())).collect();
    let file_results = pipeline.parse_many(&inputs);

    if strict {
        for result in &file_results {
            if result.success && result.bank_info.detected.is_none() {
                return Err(CliError::BankNotDetectedStrict(pipeline.app_config().confidence_threshold));
            }
        }
    }

    let manual = parse_manual_pairs(manual_pairs)?;
    let transform_result = pipeline.transform(&file_results, &manual)?;

    if let Some(export_path) = export_path {
        let file = File::create(export_path).map_err(|source| CliError::Io {
            path: export_path.display().to_string(),
            source,
        })?;
        export::write_ledger(file, &transform_result.transformed_data)?;
    }

    if format.is_json() {
        print_json(&transform_result.transfer_analysis)?;
    } else {
        println!(
            "files processed: {}, failed: {}, transactions: {}",
            transform_result.transformation_summary.files_processed,
            transform_result.transformation_summary.files_failed,
            transform_result.transformation_summary.total_transactions
        );
        println!("transfer pairs committed: {}", transform_result.transfer_analysis.pairs.len());
        println!("conflicts: {}", transform_result.transfer_analysis.conflicts.len());
        println!("flagged for review: {}", transform_result.transfer_analysis.flagged_for_review.len());
    }
    Ok(EXIT_SUCCESS)
}

fn run_detect_transfers(cli: &LedgerflowCli, path: &Path, manual_pairs: &[String], format: OutputFormat) -> Result<u8, CliError> {
    let pipeline = build_pipeline(cli)?;
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let transactions = export::read_ledger(file)?;
    let manual = parse_manual_pairs(manual_pairs)?;
    let outcome = pipeline.detect_transfers_only(&transactions, &manual)?;

    if format.is_json() {
        print_json(&outcome)?;
    } else {
        println!("transfer pairs committed: {}", outcome.pairs.len());
        println!("conflicts: {}", outcome.conflicts.len());
        println!("flagged for review: {}", outcome.flagged_for_review.len());
    }
    Ok(EXIT_SUCCESS)
}
