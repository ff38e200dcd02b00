// ==========================================
// Postal Flow - scan event entities
// ==========================================
// RawEventRow: one row as ingested, no invariants.
// Event: normalized row, sorted/deduplicated per unit.
// ==========================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RawEventRow
// ==========================================
/// One scan event as it arrives from the feed. Everything beyond the
/// identifier may be missing or malformed; the normalizer decides what
/// survives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventRow {
    /// Unit identifier (MAILITM_FID / RECPTCL_FID).
    pub unit_id: String,
    /// Timestamp as text; possibly unparseable.
    pub timestamp: String,
    /// Scan-event type code.
    pub event_type: Option<String>,
    /// Office where the scan happened.
    pub office: Option<String>,
    /// Declared next office.
    pub next_office: Option<String>,
    /// Local event name (bag feeds only; used to drop sampling rows).
    pub local_event_name: Option<String>,
}

// ==========================================
// Event (normalized)
// ==========================================
/// A normalized scan event. Within one unit, events are unique on
/// (timestamp, event_type, office) and sorted ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub unit_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub office: Option<String>,
    pub next_office: Option<String>,
    /// ISO country code derived from the identifier.
    pub country: Option<String>,
    /// Gap to the unit's next event; None on the last event.
    #[serde(with = "super::serde_duration_opt")]
    pub duration_to_next_step: Option<Duration>,
    /// Last event minus first event; repeated on every event of the unit.
    #[serde(with = "super::serde_duration_opt")]
    pub total_duration: Option<Duration>,
}

impl Event {
    /// Deduplication identity within one unit.
    pub fn dedup_key(&self) -> (DateTime<Utc>, &str, Option<&str>) {
        (self.timestamp, self.event_type.as_str(), self.office.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event_at(ts: DateTime<Utc>, code: &str, office: Option<&str>) -> Event {
        Event {
            unit_id: "RR1DZ".to_string(),
            timestamp: ts,
            event_type: code.to_string(),
            office: office.map(str::to_string),
            next_office: None,
            country: Some("DZ".to_string()),
            duration_to_next_step: None,
            total_duration: None,
        }
    }

    #[test]
    fn test_dedup_key_includes_office() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let a = event_at(ts, "34", Some("Alger CPX"));
        let b = event_at(ts, "34", Some("Oran CTR"));
        assert_ne!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key(), a.clone().dedup_key());
    }
}
