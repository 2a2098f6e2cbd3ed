//! Orchestrating crate: ties `ledgerflow-ingest`, `ledgerflow-bankconfig`,
//! `ledgerflow-normalize`, and `ledgerflow-transfers` together behind a
//! single request-boundary facade and a command-line front end (spec §6).

pub mod cli;
pub mod config_loader;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod telemetry;

pub use error::CliError;
pub use pipeline::Pipeline;
pub use telemetry::PipelineTelemetry;
