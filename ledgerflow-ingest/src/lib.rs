//! Encoding, dialect, and structure detection plus multi-strategy CSV
//! parsing and record extraction for untrusted bank statement exports
//! (spec §4.1–§4.4). This crate never looks at bank-specific
//! configuration; `ledgerflow-bankconfig` and `ledgerflow-normalize`
//! build on top of the header-keyed records produced here.

pub mod dialect;
pub mod encoding;
mod error;
pub mod headers;
pub mod parse;
pub mod process;
pub mod structure;

pub use dialect::DialectResult;
pub use dialect::QuotingMode;
pub use encoding::EncodingResult;
pub use encoding::decode_with;
pub use error::IngestError;
pub use parse::ParseOutcome;
pub use parse::ParsingStrategy;
pub use process::ProcessedData;
pub use process::ProcessingInfo;
pub use structure::StructureAnalysis;
