use thiserror::Error;

/// Fatal ingestion failures (spec §7). Row-level problems never surface
/// here — they are recorded as warnings on the result structs instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no encoding above confidence 0.0 could decode the file")]
    Encoding,

    #[error("no headers detectable and the caller required headers")]
    Structure,

    #[error("all parsing strategies failed: {0}")]
    Parsing(String),
}
