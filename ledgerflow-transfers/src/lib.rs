//! Transfer detection engine (spec §4.8): candidate identification,
//! currency-conversion pairing, cross-bank pairing, confidence scoring,
//! conflict detection, and review-flagging, reducing a session's
//! canonical transactions into committed transfer pairs.

pub mod candidate;
pub mod conversion;
pub mod crossbank;
mod engine;
mod error;
pub mod flagged;

pub use candidate::ConversionInfo;
pub use candidate::extract_conversion_info;
pub use candidate::is_candidate;
pub use conversion::ConversionPair;
pub use conversion::match_currency_conversions;
pub use crossbank::CrossBankConflict;
pub use crossbank::CrossBankPair;
pub use crossbank::MatchStrategy;
pub use crossbank::match_cross_bank;
pub use engine::CommittedPair;
pub use engine::ManualPair;
pub use engine::TransferOutcome;
pub use engine::TransferSummary;
pub use engine::TransferType;
pub use engine::detect_transfers;
pub use error::TransferError;
pub use flagged::is_large_unmatched_candidate;
