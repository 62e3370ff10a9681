//! Error taxonomy shared by every component of the workbook engine.
//!
//! This mirrors the shape of the ingestion crate this engine grew out of: one `thiserror` enum,
//! propagated with `?`, with enough structure (row/column, path, name) that the ABI boundary can
//! render a useful human-readable message into the per-workbook `last-error` slot.

use thiserror::Error;

/// Convenience result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type returned by engine operations.
///
/// Every ABI-exposed failure kind from the workbook engine's error taxonomy has exactly one
/// variant here, so `ff_getLastError()` always has stable, attributable text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Underlying I/O error (file not found, permission denied, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV/TSV parsing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet file error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "excel")]
    /// Spreadsheet decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Error raised by the embedded relational store.
    #[error("sql error: {0}")]
    Sql(#[from] polars::error::PolarsError),

    /// Manifest (de)serialization error.
    #[error("manifest json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input does not conform to what the importer expects (missing header, wrong shape).
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// `resolveFormat` could not determine (or was given) a supported format.
    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// A single cell/value could not be parsed into the inferred or declared type.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// `openFile`/`attachFile` failed before any dataset could be registered.
    #[error("open failed: {message}")]
    OpenFailed { message: String },

    /// Import succeeded in decoding but failed to register into the store.
    #[error("import failed: {message}")]
    ImportFailed { message: String },

    /// `attach` was called with a logical path already present in the workbook.
    #[error("duplicate source: '{path}'")]
    DuplicateSource { path: String },

    /// `detach`/lookups referenced a logical path not present in the workbook.
    #[error("unknown source: '{path}'")]
    UnknownSource { path: String },

    /// `register`/`rename` collided with an existing technical name.
    #[error("duplicate dataset: '{name}'")]
    DuplicateDataset { name: String },

    /// A dataset lookup referenced a technical name not present in the registry.
    #[error("unknown dataset: '{name}'")]
    UnknownDataset { name: String },

    /// `rename` was given a new name that is not a valid SQL identifier.
    #[error("invalid name: '{name}'")]
    InvalidName { name: String },

    /// The handle is absent, was never allocated, or was evicted.
    #[error("invalid handle: {handle}")]
    InvalidHandle { handle: u64 },

    /// `exportProjectManifest` / manifest import failed.
    #[error("export failed: {message}")]
    ExportFailed { message: String },

    /// An invariant the engine relies on was violated. Should never happen in production.
    #[error("internal error: {message}")]
    InternalError { message: String },
}

/// Severity classification used for observer callbacks and alerting thresholds.
///
/// Ordered so that `severity >= threshold` comparisons make sense (`Info < Warning < Error <
/// Critical`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl EngineError {
    /// Best-effort severity classification, used to decide whether an observer's `on_alert`
    /// fires.
    pub fn severity(&self) -> EngineSeverity {
        match self {
            EngineError::Io(_) => EngineSeverity::Critical,
            EngineError::InvalidHandle { .. } => EngineSeverity::Warning,
            EngineError::Csv(err) => match err.kind() {
                csv::ErrorKind::Io(_) => EngineSeverity::Critical,
                _ => EngineSeverity::Error,
            },
            EngineError::Parquet(err) if error_chain_contains_io(err) => EngineSeverity::Critical,
            #[cfg(feature = "excel")]
            EngineError::Excel(_) => EngineSeverity::Error,
            EngineError::InternalError { .. } => EngineSeverity::Critical,
            _ => EngineSeverity::Error,
        }
    }

    /// Stable non-zero status code returned across the ABI boundary. `0` is reserved for success
    /// and is never produced here.
    pub fn status_code(&self) -> i32 {
        match self {
            EngineError::Io(_) => 1,
            EngineError::OpenFailed { .. } => 2,
            EngineError::ImportFailed { .. } => 3,
            EngineError::MalformedInput { .. } => 4,
            EngineError::UnsupportedFormat { .. } => 5,
            EngineError::DuplicateSource { .. } => 6,
            EngineError::UnknownSource { .. } => 7,
            EngineError::DuplicateDataset { .. } => 8,
            EngineError::UnknownDataset { .. } => 9,
            EngineError::InvalidName { .. } => 10,
            EngineError::Sql(_) => 11,
            EngineError::ExportFailed { .. } => 12,
            EngineError::InvalidHandle { .. } => 13,
            EngineError::Csv(_) | EngineError::Parquet(_) | EngineError::ParseError { .. } => 4,
            #[cfg(feature = "excel")]
            EngineError::Excel(_) => 4,
            EngineError::Json(_) => 12,
            EngineError::InternalError { .. } => 99,
        }
    }
}

fn error_chain_contains_io(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}
