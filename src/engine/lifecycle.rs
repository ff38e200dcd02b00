// ==========================================
// Postal Flow - lifecycle derivation engine
// ==========================================
// Derives one unit's LifecycleState from its ordered event sequence.
// Pure function of the sequence: no clock, no reference data, no
// external state. Recomputed wholesale on every re-ingestion.
// ==========================================

use crate::domain::event::Event;
use crate::domain::types::{
    self, UnitStatus, EVENT_TRANSIT_CITY,
};
use crate::domain::unit::LifecycleState;

pub struct LifecycleDeriver;

impl LifecycleDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Derive the lifecycle snapshot for one unit.
    ///
    /// `events` must be the unit's full, sorted, deduplicated sequence
    /// as produced by the normalizer.
    pub fn derive(&self, unit_id: &str, events: &[Event]) -> LifecycleState {
        let mut state = LifecycleState::new(unit_id);
        if events.is_empty() {
            return state;
        }

        // === Step 1: last-seen snapshot, always from the final event ===
        let last = &events[events.len() - 1];
        state.last_known_location = last.office.clone();
        state.last_event_type = Some(last.event_type.clone());
        state.last_event_timestamp = Some(last.timestamp);

        // === Step 2: customs hold window ===
        self.derive_customs(&mut state, events);

        // === Step 3: delivery outcome ===
        self.derive_outcome(&mut state, events);

        state
    }

    /// Customs state is decided by the latest customs-type event.
    fn derive_customs(&self, state: &mut LifecycleState, events: &[Event]) {
        let customs: Vec<&Event> = events
            .iter()
            .filter(|e| types::is_customs(&e.event_type))
            .collect();
        let latest = match customs.last() {
            Some(latest) => *latest,
            None => return, // no customs history: all fields stay unset
        };

        if types::is_customs_entry(&latest.event_type) {
            state.flag_seized = true;
            state.seized_at = Some(latest.timestamp);
            // Movement after the seizure with no exit scan recorded.
            let later: Vec<&Event> = events
                .iter()
                .filter(|e| e.timestamp > latest.timestamp)
                .collect();
            if !later.is_empty()
                && !later.iter().any(|e| types::is_customs_exit(&e.event_type))
            {
                state.alert_after_seizure = true;
            }
        } else if types::is_customs_exit(&latest.event_type) {
            state.exited_at = Some(latest.timestamp);
            // Nearest earlier entry gives the hold window; without one
            // the exit stands alone and hold_duration stays unknown.
            if let Some(entry) = customs
                .iter()
                .rev()
                .find(|e| types::is_customs_entry(&e.event_type))
            {
                state.seized_at = Some(entry.timestamp);
                state.hold_duration = Some(latest.timestamp - entry.timestamp);
            }
        }
    }

    /// Status priority: any success event wins over failure events,
    /// even failures later in time. Preserved business rule, not a
    /// chronological tie-break.
    fn derive_outcome(&self, state: &mut LifecycleState, events: &[Event]) {
        let first_success_pos = events
            .iter()
            .position(|e| types::is_success(&e.event_type));
        let failure_positions: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| types::is_failure(&e.event_type))
            .map(|(i, _)| i)
            .collect();

        if let Some(success_pos) = first_success_pos {
            let delivered_at = events[success_pos].timestamp;
            state.status = UnitStatus::Success;
            state.delivered_at = Some(delivered_at);
            state.failure_before_success_count = failure_positions
                .iter()
                .filter(|&&i| events[i].timestamp < delivered_at)
                .count() as u32;
            state.recovered_after_failure = state.failure_before_success_count > 0;
            // Activity recorded after delivery is suspicious.
            if success_pos != events.len() - 1 {
                state.alert_after_success = true;
            }
        } else if let Some(&last_failure_pos) = failure_positions.last() {
            state.status = UnitStatus::Failure;
            state.failed_at = Some(events[failure_positions[0]].timestamp);
            state.cities_after_failure_count = events[last_failure_pos + 1..]
                .iter()
                .filter(|e| e.event_type == EVENT_TRANSIT_CITY)
                .count() as u32;
        } else {
            state.status = UnitStatus::InProcess;
        }
    }
}

impl Default for LifecycleDeriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn event(day: u32, hour: u32, code: &str, office: &str) -> Event {
        Event {
            unit_id: "RR1DZ".to_string(),
            timestamp: ts(day, hour),
            event_type: code.to_string(),
            office: Some(office.to_string()),
            next_office: None,
            country: Some("DZ".to_string()),
            duration_to_next_step: None,
            total_duration: None,
        }
    }

    #[test]
    fn test_in_process_without_outcome_events() {
        let deriver = LifecycleDeriver::new();
        let events = vec![event(1, 8, "34", "Alger CPX"), event(2, 8, "32", "Blida CDD")];
        let state = deriver.derive("RR1DZ", &events);

        assert_eq!(state.status, UnitStatus::InProcess);
        assert_eq!(state.delivered_at, None);
        assert_eq!(state.last_known_location.as_deref(), Some("Blida CDD"));
        assert_eq!(state.last_event_type.as_deref(), Some("32"));
        assert_eq!(state.last_event_timestamp, Some(ts(2, 8)));
    }

    #[test]
    fn test_success_wins_over_later_failure() {
        let deriver = LifecycleDeriver::new();
        let events = vec![
            event(1, 8, "36", "Alger BP"),
            event(2, 8, "37", "Alger BP"),
            event(3, 8, "36", "Alger BP"),
        ];
        let state = deriver.derive("RR1DZ", &events);

        assert_eq!(state.status, UnitStatus::Success);
        assert_eq!(state.delivered_at, Some(ts(2, 8)));
        // Only failures strictly before delivery are counted.
        assert_eq!(state.failure_before_success_count, 1);
        assert!(state.recovered_after_failure);
        // The success is not the final event.
        assert!(state.alert_after_success);
    }

    #[test]
    fn test_success_as_last_event_is_clean() {
        let deriver = LifecycleDeriver::new();
        let events = vec![event(1, 8, "34", "Alger BP"), event(2, 8, "37", "Alger BP")];
        let state = deriver.derive("RR1DZ", &events);

        assert_eq!(state.status, UnitStatus::Success);
        assert!(!state.alert_after_success);
        assert!(!state.recovered_after_failure);
        assert_eq!(state.failure_before_success_count, 0);
    }

    #[test]
    fn test_failure_counts_cities_after_last_failure() {
        let deriver = LifecycleDeriver::new();
        let events = vec![
            event(1, 8, "36", "Alger BP"),
            event(2, 8, "32", "Blida CDD"),
            event(3, 8, "36", "Blida BP"),
            event(4, 8, "32", "Médéa CDD"),
            event(5, 8, "32", "Chlef CDD"),
        ];
        let state = deriver.derive("RR1DZ", &events);

        assert_eq!(state.status, UnitStatus::Failure);
        assert_eq!(state.failed_at, Some(ts(1, 8)));
        // Hops after the *last* failure only.
        assert_eq!(state.cities_after_failure_count, 2);
    }

    #[test]
    fn test_customs_seizure_with_movement_and_no_exit() {
        let deriver = LifecycleDeriver::new();
        let events = vec![
            event(1, 8, "34", "Alger CPX"),
            event(2, 8, "31", "Alger CPX"),
            event(3, 8, "32", "Blida CDD"),
        ];
        let state = deriver.derive("RR1DZ", &events);

        assert!(state.flag_seized);
        assert_eq!(state.seized_at, Some(ts(2, 8)));
        assert!(state.alert_after_seizure);
        assert_eq!(state.exited_at, None);
        assert_eq!(state.hold_duration, None);
    }

    #[test]
    fn test_customs_exit_computes_hold_duration() {
        let deriver = LifecycleDeriver::new();
        let events = vec![
            event(1, 8, "6", "Alger CPX"),
            event(3, 8, "7", "Alger CPX"),
            event(4, 8, "32", "Blida CDD"),
        ];
        let state = deriver.derive("RR1DZ", &events);

        assert!(!state.flag_seized);
        assert_eq!(state.seized_at, Some(ts(1, 8)));
        assert_eq!(state.exited_at, Some(ts(3, 8)));
        assert_eq!(state.hold_duration, Some(chrono::Duration::days(2)));
        assert!(!state.alert_after_seizure);
    }

    #[test]
    fn test_customs_exit_without_prior_entry() {
        let deriver = LifecycleDeriver::new();
        let events = vec![event(1, 8, "34", "Alger CPX"), event(2, 8, "38", "Alger CPX")];
        let state = deriver.derive("RR1DZ", &events);

        assert_eq!(state.exited_at, Some(ts(2, 8)));
        assert_eq!(state.seized_at, None);
        assert_eq!(state.hold_duration, None);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let deriver = LifecycleDeriver::new();
        let events = vec![
            event(1, 8, "36", "Alger BP"),
            event(2, 8, "37", "Alger BP"),
            event(3, 8, "31", "Alger CPX"),
        ];
        let first = deriver.derive("RR1DZ", &events);
        let second = deriver.derive("RR1DZ", &events);
        assert_eq!(first, second);
    }
}
