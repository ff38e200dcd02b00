// ==========================================
// Postal Flow - alert rule engine
// ==========================================
// Evaluates the eight fixed operational exception rules over one
// unit's event sequence, relative to the caller's reference time.
// Alerts model open exceptions, not historical facts: the same
// history can start or stop firing as `now` advances.
// ==========================================

use crate::domain::alert::{AlertKey, AlertOccurrence, RuleCode};
use crate::domain::event::Event;
use crate::domain::types;
use crate::reference::region::RegionResolver;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::debug;

// ==========================================
// Anchor offices
// ==========================================
// Matching is case-insensitive substring, the way the office names
// appear in the feed (with and without the center prefix).

/// Air hub ("Centre Aéropostal HB").
const AIR_HUB_FRAGMENT: &str = "aéropostal";
/// Algiers parcel center.
const PARCEL_CENTER_NAME: &str = "Alger CPX";
const PARCEL_CENTER_FRAGMENT: &str = "alger cpx";
/// National sorting center.
const SORTING_CENTER_NAME: &str = "CTNI";
const SORTING_CENTER_FRAGMENT: &str = "ctni";

fn office_contains(office: Option<&str>, fragment: &str) -> bool {
    office
        .map(|name| name.to_lowercase().contains(fragment))
        .unwrap_or(false)
}

/// A rule firing before office/region resolution.
struct Candidate {
    code: RuleCode,
    office_name: Option<String>,
    timestamp: DateTime<Utc>,
}

// ==========================================
// AlertRuleEngine
// ==========================================
pub struct AlertRuleEngine<'a> {
    resolver: &'a RegionResolver,
}

impl<'a> AlertRuleEngine<'a> {
    pub fn new(resolver: &'a RegionResolver) -> Self {
        Self { resolver }
    }

    /// Evaluate every rule for one unit.
    ///
    /// `existing_keys` carries already-persisted alert identities and
    /// doubles as the working set: keys emitted here are added to it,
    /// so a single run never produces internal duplicates either.
    pub fn evaluate(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        existing_keys: &mut HashSet<AlertKey>,
    ) -> Vec<AlertOccurrence> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        self.rule_unreceived_transmission(events, now, &mut candidates);
        self.rule_pending_distribution(events, now, &mut candidates);
        self.rule_air_hub_idle(events, now, &mut candidates);
        self.rule_hub_to_parcel_center(events, now, &mut candidates);
        self.rule_parcel_center_to_sorting(events, now, &mut candidates);
        self.rule_center_inactivity(events, now, &mut candidates);
        self.rule_concentration_delay(events, now, &mut candidates);

        let mut alerts = Vec::new();
        for candidate in candidates {
            let resolved = self.resolver.resolve_with_fallback(
                candidate.office_name.as_deref(),
                events,
                candidate.timestamp,
            );
            let (office_id, office_name, region_id, region_name) = match resolved {
                Some((office, region)) => (
                    Some(office.id),
                    Some(office.name.clone()),
                    Some(region.id),
                    Some(region.name.clone()),
                ),
                None => (None, None, None, None),
            };

            let key: AlertKey = (candidate.code, candidate.timestamp, office_id, region_id);
            if !existing_keys.insert(key) {
                continue;
            }

            let def = candidate.code.definition();
            debug!(code = %candidate.code, office = ?office_name, "alert raised");
            alerts.push(AlertOccurrence {
                code: candidate.code,
                title: def.title.to_string(),
                trigger_condition: def.trigger_condition.to_string(),
                severity: def.severity.to_string(),
                action_required: def.action_required.to_string(),
                office_id,
                office_name,
                region_id,
                region_name,
                timestamp: candidate.timestamp,
            });
        }
        alerts
    }

    /// ALR001: transmission towards a destination office with no scan
    /// at that office within 3 days.
    fn rule_unreceived_transmission(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        out: &mut Vec<Candidate>,
    ) {
        for ev in events.iter().filter(|e| types::is_transmission(&e.event_type)) {
            let dest = ev.next_office.as_deref();
            let received = events.iter().any(|later| {
                later.timestamp > ev.timestamp && later.office.as_deref() == dest && dest.is_some()
            });
            if !received && (now - ev.timestamp).num_days() > 3 {
                out.push(Candidate {
                    code: RuleCode::Alr001,
                    office_name: dest.map(str::to_string),
                    timestamp: ev.timestamp,
                });
            }
        }
    }

    /// ALR002 / ALR003: reception with no delivery outcome within 24h,
    /// and no outcome nor customs exit within 15 days.
    fn rule_pending_distribution(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        out: &mut Vec<Candidate>,
    ) {
        for ev in events.iter().filter(|e| types::is_reception(&e.event_type)) {
            let outcome_seen = events.iter().any(|later| {
                later.timestamp > ev.timestamp
                    && (types::is_success(&later.event_type)
                        || types::is_failure(&later.event_type))
            });
            if !outcome_seen && now - ev.timestamp > Duration::hours(24) {
                out.push(Candidate {
                    code: RuleCode::Alr002,
                    office_name: ev.office.clone(),
                    timestamp: ev.timestamp,
                });
            }

            let outcome_or_exit_seen = events.iter().any(|later| {
                later.timestamp > ev.timestamp
                    && (types::is_success(&later.event_type)
                        || types::is_failure(&later.event_type)
                        || later.event_type == "38")
            });
            if !outcome_or_exit_seen && (now - ev.timestamp).num_days() > 15 {
                out.push(Candidate {
                    code: RuleCode::Alr003,
                    office_name: ev.office.clone(),
                    timestamp: ev.timestamp,
                });
            }
        }
    }

    /// ALR004: scan at the air hub with no onward movement to a
    /// different office within 1 day.
    fn rule_air_hub_idle(&self, events: &[Event], now: DateTime<Utc>, out: &mut Vec<Candidate>) {
        for ev in events
            .iter()
            .filter(|e| office_contains(e.office.as_deref(), AIR_HUB_FRAGMENT))
        {
            let moved_on = events
                .iter()
                .any(|later| later.timestamp > ev.timestamp && later.office != ev.office);
            if !moved_on && (now - ev.timestamp).num_days() >= 1 {
                out.push(Candidate {
                    code: RuleCode::Alr004,
                    office_name: ev.office.clone(),
                    timestamp: ev.timestamp,
                });
            }
        }
    }

    /// ALR005: air hub dispatch towards Alger CPX not received there
    /// within 2 days.
    fn rule_hub_to_parcel_center(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        out: &mut Vec<Candidate>,
    ) {
        for ev in events.iter().filter(|e| {
            office_contains(e.office.as_deref(), AIR_HUB_FRAGMENT)
                && office_contains(e.next_office.as_deref(), PARCEL_CENTER_FRAGMENT)
        }) {
            let received = events.iter().any(|later| {
                later.timestamp > ev.timestamp
                    && office_contains(later.office.as_deref(), PARCEL_CENTER_FRAGMENT)
            });
            if !received && (now - ev.timestamp).num_days() > 2 {
                out.push(Candidate {
                    code: RuleCode::Alr005,
                    office_name: Some(PARCEL_CENTER_NAME.to_string()),
                    timestamp: ev.timestamp,
                });
            }
        }
    }

    /// ALR006: Alger CPX dispatch towards the CTNI not received there
    /// within 2 days.
    fn rule_parcel_center_to_sorting(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        out: &mut Vec<Candidate>,
    ) {
        for ev in events.iter().filter(|e| {
            office_contains(e.office.as_deref(), PARCEL_CENTER_FRAGMENT)
                && office_contains(e.next_office.as_deref(), SORTING_CENTER_FRAGMENT)
        }) {
            let received = events.iter().any(|later| {
                later.timestamp > ev.timestamp
                    && office_contains(later.office.as_deref(), SORTING_CENTER_FRAGMENT)
            });
            if !received && (now - ev.timestamp).num_days() > 2 {
                out.push(Candidate {
                    code: RuleCode::Alr006,
                    office_name: Some(SORTING_CENTER_NAME.to_string()),
                    timestamp: ev.timestamp,
                });
            }
        }
    }

    /// ALR007: no CPX/CTNI activity for more than 3 hours, measured
    /// from the latest such event to `now`.
    fn rule_center_inactivity(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        out: &mut Vec<Candidate>,
    ) {
        let activity: Vec<&Event> = events
            .iter()
            .filter(|e| {
                let office = e.office.as_deref().map(str::to_lowercase);
                office
                    .map(|name| name.contains("cpx") || name.contains(SORTING_CENTER_FRAGMENT))
                    .unwrap_or(false)
            })
            .collect();
        if let Some(last) = activity.last() {
            if now - last.timestamp > Duration::hours(3) {
                out.push(Candidate {
                    code: RuleCode::Alr007,
                    office_name: last.office.clone(),
                    timestamp: last.timestamp,
                });
            }
        }
    }

    /// ALR008: reception with no movement to a different office within
    /// 4 days.
    fn rule_concentration_delay(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
        out: &mut Vec<Candidate>,
    ) {
        for ev in events.iter().filter(|e| types::is_reception(&e.event_type)) {
            let moved_on = events
                .iter()
                .any(|later| later.timestamp > ev.timestamp && later.office != ev.office);
            if !moved_on && (now - ev.timestamp).num_days() > 4 {
                out.push(Candidate {
                    code: RuleCode::Alr008,
                    office_name: ev.office.clone(),
                    timestamp: ev.timestamp,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn resolver() -> RegionResolver {
        RegionResolver::from_entries(vec![
            ("Alger CPX", 16, "Alger"),
            ("Centre Aéropostal HB", 16, "Alger"),
            ("CTNI", 16, "Alger"),
            ("Oran CTR", 31, "Oran"),
            ("Blida CDD", 9, "Blida"),
        ])
    }

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn event(day: u32, hour: u32, code: &str, office: Option<&str>, next: Option<&str>) -> Event {
        Event {
            unit_id: "RR1DZ".to_string(),
            timestamp: ts(day, hour),
            event_type: code.to_string(),
            office: office.map(str::to_string),
            next_office: next.map(str::to_string),
            country: Some("DZ".to_string()),
            duration_to_next_step: None,
            total_duration: None,
        }
    }

    #[test]
    fn test_alr001_unreceived_transmission() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![event(1, 8, "32", Some("Blida CDD"), Some("Oran CTR"))];
        let now = ts(5, 8); // 4 days later, no reception at Oran CTR

        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, now, &mut existing);

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.code, RuleCode::Alr001);
        assert_eq!(alert.timestamp, ts(1, 8));
        assert_eq!(alert.office_name.as_deref(), Some("Oran CTR"));
        assert_eq!(alert.region_name.as_deref(), Some("Oran"));
        assert_eq!(alert.title, "Envois non réceptionnés après transmission");
    }

    #[test]
    fn test_alr001_suppressed_by_reception_at_destination() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![
            event(1, 8, "32", Some("Blida CDD"), Some("Oran CTR")),
            event(2, 8, "34", Some("Oran CTR"), None),
        ];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(10, 8), &mut existing);
        assert!(alerts.iter().all(|a| a.code != RuleCode::Alr001));
    }

    #[test]
    fn test_alr002_within_window_is_silent() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![event(1, 8, "34", Some("Blida CDD"), None)];

        let mut existing = HashSet::new();
        // 12 hours later: under the 24h window.
        let alerts = engine.evaluate(&events, ts(1, 20), &mut existing);
        assert!(alerts.iter().all(|a| a.code != RuleCode::Alr002));

        // 25 hours later: fires.
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(2, 9), &mut existing);
        assert!(alerts.iter().any(|a| a.code == RuleCode::Alr002));
    }

    #[test]
    fn test_alr003_fires_after_15_days_without_outcome() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![event(1, 8, "34", Some("Blida CDD"), None)];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(17, 8), &mut existing);
        assert!(alerts.iter().any(|a| a.code == RuleCode::Alr003));

        // A customs exit (38) suppresses ALR003 but not ALR002's
        // distribution expectation.
        let events = vec![
            event(1, 8, "34", Some("Blida CDD"), None),
            event(2, 8, "38", Some("Blida CDD"), None),
        ];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(17, 8), &mut existing);
        assert!(alerts.iter().all(|a| a.code != RuleCode::Alr003));
        assert!(alerts.iter().any(|a| a.code == RuleCode::Alr002));
    }

    #[test]
    fn test_alr004_air_hub_idle() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![event(1, 8, "33", Some("Centre Aéropostal HB"), None)];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(2, 9), &mut existing);
        let alr004: Vec<_> = alerts.iter().filter(|a| a.code == RuleCode::Alr004).collect();
        assert_eq!(alr004.len(), 1);
        assert_eq!(alr004[0].office_name.as_deref(), Some("Centre Aéropostal HB"));
    }

    #[test]
    fn test_alr005_and_alr006_center_chains() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![event(
            1,
            8,
            "33",
            Some("Centre Aéropostal HB"),
            Some("Alger CPX"),
        )];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(4, 8), &mut existing);
        assert!(alerts.iter().any(|a| a.code == RuleCode::Alr005
            && a.office_name.as_deref() == Some("Alger CPX")));

        let events = vec![event(1, 8, "33", Some("Alger CPX"), Some("CTNI"))];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(4, 8), &mut existing);
        assert!(alerts
            .iter()
            .any(|a| a.code == RuleCode::Alr006 && a.office_name.as_deref() == Some("CTNI")));
    }

    #[test]
    fn test_alr007_center_inactivity() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![
            event(1, 8, "34", Some("Alger CPX"), None),
            event(1, 10, "33", Some("Alger CPX"), Some("CTNI")),
        ];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(1, 14), &mut existing);
        let alr007: Vec<_> = alerts.iter().filter(|a| a.code == RuleCode::Alr007).collect();
        assert_eq!(alr007.len(), 1);
        // Anchored to the latest CPX/CTNI activity.
        assert_eq!(alr007[0].timestamp, ts(1, 10));

        // Two hours of quiet is within tolerance.
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(1, 12), &mut existing);
        assert!(alerts.iter().all(|a| a.code != RuleCode::Alr007));
    }

    #[test]
    fn test_fallback_to_prior_next_office() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        // Reception at an unknown office; the prior event declared a
        // resolvable next office.
        let events = vec![
            event(1, 8, "32", Some("Unknown Office"), Some("Blida CDD")),
            event(2, 8, "34", Some("Bureau Inconnu"), None),
        ];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(10, 8), &mut existing);
        let alr008: Vec<_> = alerts.iter().filter(|a| a.code == RuleCode::Alr008).collect();
        assert_eq!(alr008.len(), 1);
        assert_eq!(alr008[0].office_name.as_deref(), Some("Blida CDD"));
        assert_eq!(alr008[0].region_name.as_deref(), Some("Blida"));
    }

    #[test]
    fn test_unresolvable_office_emits_null_office() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![event(2, 8, "34", Some("Bureau Inconnu"), None)];
        let mut existing = HashSet::new();
        let alerts = engine.evaluate(&events, ts(10, 8), &mut existing);
        let alr008: Vec<_> = alerts.iter().filter(|a| a.code == RuleCode::Alr008).collect();
        assert_eq!(alr008.len(), 1);
        assert_eq!(alr008[0].office_id, None);
        assert_eq!(alr008[0].region_id, None);
    }

    #[test]
    fn test_rerun_with_emitted_keys_is_silent() {
        let resolver = resolver();
        let engine = AlertRuleEngine::new(&resolver);
        let events = vec![
            event(1, 8, "32", Some("Blida CDD"), Some("Oran CTR")),
            event(2, 8, "34", Some("Blida CDD"), None),
        ];
        let now = ts(20, 8);

        let mut keys = HashSet::new();
        let first_run = engine.evaluate(&events, now, &mut keys);
        assert!(!first_run.is_empty());

        // Second run with the first run's keys yields nothing new.
        let second_run = engine.evaluate(&events, now, &mut keys);
        assert!(second_run.is_empty());
    }
}
