// ==========================================
// Postal Flow - batch metadata
// ==========================================
// Advisory observability record of one ingestion. Never consulted by
// downstream derivation logic.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ==========================================
// BatchMetadata
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Rows received before any cleaning.
    pub raw_rows: usize,
    /// Rows surviving every cleaning step.
    pub rows_after_cleaning: usize,

    // Drop counters, by cause
    pub dropped_bad_identifier: usize,
    pub dropped_bad_timestamp: usize,
    pub dropped_duplicates: usize,
    pub dropped_sampling_rows: usize,

    // Missing-value counters over surviving rows
    pub missing_event_type: usize,
    pub missing_office: usize,
    pub missing_next_office: usize,

    pub unique_units: usize,
    /// Event-type code -> occurrence count.
    pub event_type_counts: HashMap<String, usize>,

    pub earliest_timestamp: Option<DateTime<Utc>>,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub time_range_days: Option<i64>,

    pub cleaning_time_seconds: f64,
    pub warnings: Vec<String>,
}

impl BatchMetadata {
    /// Top event-type codes by frequency, most frequent first.
    pub fn top_event_types(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .event_type_counts
            .iter()
            .map(|(code, count)| (code.clone(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(n);
        counts
    }
}

// ==========================================
// UploadRecord
// ==========================================
/// One persisted-upload ledger entry handed to the storage
/// collaborator alongside the derived output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: Uuid,
    pub filename: String,
    pub file_size_bytes: u64,
    pub file_type: String,
    pub upload_timestamp: DateTime<Utc>,
    pub metadata: BatchMetadata,
}

impl UploadRecord {
    pub fn new(filename: impl Into<String>, file_size_bytes: u64, metadata: BatchMetadata) -> Self {
        let filename = filename.into();
        let file_type = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_else(|| "csv".to_string());
        Self {
            id: Uuid::new_v4(),
            filename,
            file_size_bytes,
            file_type,
            upload_timestamp: Utc::now(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_event_types_ordering() {
        let mut metadata = BatchMetadata::default();
        metadata.event_type_counts.insert("34".to_string(), 5);
        metadata.event_type_counts.insert("37".to_string(), 2);
        metadata.event_type_counts.insert("32".to_string(), 5);

        let top = metadata.top_event_types(2);
        // Equal counts fall back to code order for a stable report.
        assert_eq!(top, vec![("32".to_string(), 5), ("34".to_string(), 5)]);
    }

    #[test]
    fn test_upload_record_file_type() {
        let record = UploadRecord::new("scan_export.csv", 1024, BatchMetadata::default());
        assert_eq!(record.file_type, "csv");
        assert_eq!(record.filename, "scan_export.csv");
    }
}
