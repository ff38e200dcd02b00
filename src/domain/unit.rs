// ==========================================
// Postal Flow - unit entities
// ==========================================
// Unit: a tracked mail item or bag with its ordered event history.
// LifecycleState: the wholesale-derived status snapshot for one unit.
// ==========================================

use crate::domain::event::Event;
use crate::domain::types::{UnitKind, UnitStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Unit
// ==========================================
/// A tracked logistics unit. The event sequence is non-empty, sorted
/// ascending by timestamp and deduplicated by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub kind: UnitKind,
    pub country: Option<String>,
    pub events: Vec<Event>,
}

impl Unit {
    pub fn new(id: impl Into<String>, kind: UnitKind, events: Vec<Event>) -> Self {
        let country = events.iter().find_map(|e| e.country.clone());
        Self {
            id: id.into(),
            kind,
            country,
            events,
        }
    }

    /// Chronologically last event. The normalizer never emits an empty
    /// unit, so callers may rely on this being present.
    pub fn last_event(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn total_duration(&self) -> Option<Duration> {
        self.events.first().and_then(|e| e.total_duration)
    }
}

// ==========================================
// LifecycleState
// ==========================================
/// Derived per-unit lifecycle snapshot. Recomputed wholesale on every
/// re-ingestion of the unit; never incrementally patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub unit_id: String,
    pub status: UnitStatus,

    // Delivery outcome
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Activity recorded after the unit was marked delivered.
    pub alert_after_success: bool,
    pub failure_before_success_count: u32,
    pub recovered_after_failure: bool,
    /// Code-32 city hops strictly after the last failure event.
    pub cities_after_failure_count: u32,

    // Customs hold
    pub flag_seized: bool,
    pub seized_at: Option<DateTime<Utc>>,
    pub exited_at: Option<DateTime<Utc>>,
    #[serde(with = "super::serde_duration_opt")]
    pub hold_duration: Option<Duration>,
    /// Movement after seizure with no customs exit recorded.
    pub alert_after_seizure: bool,

    // Last-seen snapshot
    pub last_known_location: Option<String>,
    pub last_event_type: Option<String>,
    pub last_event_timestamp: Option<DateTime<Utc>>,
}

impl LifecycleState {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            ..Default::default()
        }
    }
}
