// ==========================================
// Postal Flow - event normalizer
// ==========================================
// Turns a raw row set into per-unit sorted, deduplicated event
// sequences. Batch-fatal problems abort with ImportError; row-level
// problems drop the row and count it in BatchMetadata.
// ==========================================

use crate::domain::event::{Event, RawEventRow};
use crate::domain::types::{UnitKind, EVENT_BAG_ARRIVAL};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{ColumnProfile, RowTable};
use crate::importer::metadata::BatchMetadata;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bag rows carrying this local event name are sampling probes, not
/// movements, and are removed before any derivation.
const SAMPLING_EVENT_NAME: &str = "Receptacle evaluated for sampling";

// ==========================================
// NormalizedBatch
// ==========================================
/// Normalizer output: unit identifier -> ordered event sequence, plus
/// the advisory batch metadata.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub kind: UnitKind,
    pub units: BTreeMap<String, Vec<Event>>,
    pub metadata: BatchMetadata,
}

// ==========================================
// EventNormalizer
// ==========================================
pub struct EventNormalizer {
    kind: UnitKind,
}

impl EventNormalizer {
    pub fn new(kind: UnitKind) -> Self {
        Self { kind }
    }

    /// Normalize a tabular row set. Fails when a required column is
    /// missing; otherwise defers to [`normalize_rows`].
    ///
    /// [`normalize_rows`]: EventNormalizer::normalize_rows
    pub fn normalize_table(&self, table: &RowTable) -> ImportResult<NormalizedBatch> {
        let profile = ColumnProfile::for_kind(self.kind);
        let missing: Vec<String> = profile
            .required()
            .iter()
            .filter(|col| !table.has_column(col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }
        self.normalize_rows(table.to_raw_rows(self.kind))
    }

    /// Normalize already-projected raw rows.
    ///
    /// Steps: sampling filter (bags) -> identifier shape check ->
    /// timestamp parse -> sort -> dedupe -> per-unit durations.
    pub fn normalize_rows(&self, rows: Vec<RawEventRow>) -> ImportResult<NormalizedBatch> {
        let started = Instant::now();
        let mut metadata = BatchMetadata {
            raw_rows: rows.len(),
            ..Default::default()
        };
        if rows.is_empty() {
            return Err(ImportError::EmptyBatch);
        }
        debug!(kind = %self.kind, rows = rows.len(), "normalizing batch");

        // --- Row-level filters ---
        let mut timestamp_candidates = 0usize;
        let mut events: Vec<Event> = Vec::with_capacity(rows.len());
        for row in rows {
            if self.kind == UnitKind::Bag
                && row.local_event_name.as_deref() == Some(SAMPLING_EVENT_NAME)
            {
                metadata.dropped_sampling_rows += 1;
                continue;
            }
            if !self.kind.identifier_is_valid(&row.unit_id) {
                metadata.dropped_bad_identifier += 1;
                continue;
            }
            timestamp_candidates += 1;
            let timestamp = match parse_timestamp(&row.timestamp) {
                Some(ts) => ts,
                None => {
                    metadata.dropped_bad_timestamp += 1;
                    continue;
                }
            };

            let country = self.kind.derive_country(&row.unit_id);
            let mut office = row.office;
            // Bag arrivals without an office fall back to the country
            // of origin so the event stays locatable.
            if self.kind == UnitKind::Bag
                && row.event_type.as_deref() == Some(EVENT_BAG_ARRIVAL)
                && office.is_none()
            {
                office = country.clone();
            }

            events.push(Event {
                unit_id: row.unit_id,
                timestamp,
                event_type: row.event_type.unwrap_or_default(),
                office,
                next_office: row.next_office,
                country,
                duration_to_next_step: None,
                total_duration: None,
            });
        }

        if events.is_empty() {
            if metadata.dropped_bad_timestamp > 0
                && metadata.dropped_bad_timestamp == timestamp_candidates
            {
                return Err(ImportError::NoParseableTimestamps {
                    total: timestamp_candidates,
                });
            }
            return Err(ImportError::EmptyBatch);
        }

        // --- Sort, then dedupe keeping the first occurrence ---
        events.sort_by(|a, b| {
            a.unit_id
                .cmp(&b.unit_id)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
        let mut seen: HashSet<(String, DateTime<Utc>, String, Option<String>)> =
            HashSet::with_capacity(events.len());
        let before_dedup = events.len();
        events.retain(|e| {
            seen.insert((
                e.unit_id.clone(),
                e.timestamp,
                e.event_type.clone(),
                e.office.clone(),
            ))
        });
        metadata.dropped_duplicates = before_dedup - events.len();
        if metadata.dropped_duplicates > 0 {
            metadata
                .warnings
                .push(format!("removed {} duplicate rows", metadata.dropped_duplicates));
        }
        if metadata.dropped_sampling_rows > 0 {
            metadata.warnings.push(format!(
                "removed {} sampling evaluation rows",
                metadata.dropped_sampling_rows
            ));
        }

        // --- Missing-value and frequency counters ---
        for event in &events {
            if event.event_type.is_empty() {
                metadata.missing_event_type += 1;
            } else {
                *metadata
                    .event_type_counts
                    .entry(event.event_type.clone())
                    .or_insert(0) += 1;
            }
            if event.office.is_none() {
                metadata.missing_office += 1;
            }
            if event.next_office.is_none() {
                metadata.missing_next_office += 1;
            }
        }
        metadata.rows_after_cleaning = events.len();
        metadata.earliest_timestamp = events.iter().map(|e| e.timestamp).min();
        metadata.latest_timestamp = events.iter().map(|e| e.timestamp).max();
        metadata.time_range_days = match (metadata.earliest_timestamp, metadata.latest_timestamp) {
            (Some(first), Some(last)) => Some((last - first).num_days()),
            _ => None,
        };

        // --- Group per unit and derive durations ---
        let mut units: BTreeMap<String, Vec<Event>> = BTreeMap::new();
        for event in events {
            units.entry(event.unit_id.clone()).or_default().push(event);
        }
        for sequence in units.values_mut() {
            let first = sequence[0].timestamp;
            let last = sequence[sequence.len() - 1].timestamp;
            let total = last - first;
            for i in 0..sequence.len() {
                sequence[i].total_duration = Some(total);
                sequence[i].duration_to_next_step = sequence
                    .get(i + 1)
                    .map(|next| next.timestamp)
                    .map(|next_ts| next_ts - sequence[i].timestamp);
            }
        }
        metadata.unique_units = units.len();
        metadata.cleaning_time_seconds = started.elapsed().as_secs_f64();

        if metadata.dropped_bad_identifier > 0 || metadata.dropped_bad_timestamp > 0 {
            warn!(
                bad_identifier = metadata.dropped_bad_identifier,
                bad_timestamp = metadata.dropped_bad_timestamp,
                "dropped malformed rows during normalization"
            );
        }
        info!(
            kind = %self.kind,
            units = metadata.unique_units,
            rows = metadata.rows_after_cleaning,
            "batch normalized"
        );

        Ok(NormalizedBatch {
            kind: self.kind,
            units,
            metadata,
        })
    }
}

// ==========================================
// Timestamp parsing
// ==========================================
/// Parse a feed timestamp. Accepts RFC 3339 and the usual spreadsheet
/// export shapes; naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
