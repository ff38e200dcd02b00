// ==========================================
// Postal Flow - import layer
// ==========================================
// External data in: CSV parsing, row normalization, batch metadata.
// ==========================================

pub mod error;
pub mod file_parser;
pub mod metadata;
pub mod normalizer;

pub use error::{ImportError, ImportResult};
pub use file_parser::{ColumnProfile, CsvParser, RowTable};
pub use metadata::{BatchMetadata, UploadRecord};
pub use normalizer::{parse_timestamp, EventNormalizer, NormalizedBatch};
