// ==========================================
// Postal Flow - import error types
// ==========================================
// thiserror taxonomy. Batch-fatal problems are variants here; row-level
// problems are recovered locally and only counted in batch metadata.
// ==========================================

use thiserror::Error;

/// Import / normalization errors. Any of these aborts the batch.
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== File-level errors =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (only .csv is accepted)")]
    UnsupportedFormat(String),

    #[error("file read failed: {0}")]
    FileReadError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    // ===== Batch validation errors =====
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no parseable timestamps in batch ({total} rows, all dropped)")]
    NoParseableTimestamps { total: usize },

    #[error("batch is empty after cleaning")]
    EmptyBatch,

    // ===== Generic =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result alias for the import layer.
pub type ImportResult<T> = Result<T, ImportError>;
