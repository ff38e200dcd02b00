// ==========================================
// Postal Flow - batch statistics
// ==========================================
// Simple reductions over already-derived output: status rates,
// delivery durations, recovery and customs KPIs, late transitions.
// No temporal logic lives here.
// ==========================================

use crate::domain::transition::TransitionRecord;
use crate::domain::types::UnitStatus;
use crate::domain::unit::{LifecycleState, Unit};
use chrono::Duration;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// On-time delivery threshold.
pub const SLA_DAYS: i64 = 15;
/// Durations above this are considered data noise and ignored.
pub const MAX_ALLOWED_DAYS: i64 = 365 * 5;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round4(numerator as f64 / denominator as f64)
    }
}

fn mean_seconds(durations: &[Duration]) -> Option<f64> {
    if durations.is_empty() {
        return None;
    }
    let total: i64 = durations.iter().map(|d| d.num_seconds()).sum();
    Some(total as f64 / durations.len() as f64)
}

fn median_seconds(durations: &[Duration]) -> Option<f64> {
    if durations.is_empty() {
        return None;
    }
    let mut seconds: Vec<i64> = durations.iter().map(|d| d.num_seconds()).collect();
    seconds.sort_unstable();
    let mid = seconds.len() / 2;
    Some(if seconds.len() % 2 == 0 {
        (seconds[mid - 1] + seconds[mid]) as f64 / 2.0
    } else {
        seconds[mid] as f64
    })
}

// ==========================================
// BatchStats
// ==========================================
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    // General status counts
    pub total_units: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub in_process_count: usize,
    pub done_count: usize,
    pub success_rate_all: f64,
    pub failure_rate_all: f64,
    pub success_rate_done: f64,
    pub on_time_delivery_rate: f64,
    pub average_delivery_duration_seconds: Option<f64>,
    pub median_delivery_duration_seconds: Option<f64>,

    // Recovery KPIs
    pub recovered_after_failure_count: usize,
    pub recovery_rate_success: f64,
    pub avg_failures_before_success: f64,

    // Customs KPIs
    pub in_customs_count: usize,
    pub exited_customs_count: usize,
    pub customs_alert_count: usize,
    pub avg_customs_hold_seconds: Option<f64>,
    pub median_customs_hold_seconds: Option<f64>,

    // Post-failure movement KPIs
    pub total_cities_after_failure: u64,
    pub max_cities_after_failure: u32,
    pub avg_cities_after_failure: f64,
    pub units_with_post_failure_movement: usize,
    pub pct_with_post_failure_movement: f64,
}

impl BatchStats {
    /// Compute the per-batch KPI snapshot. `units` supplies total
    /// durations; `lifecycles` supplies the derived flags.
    pub fn compute(units: &[Unit], lifecycles: &[LifecycleState]) -> Self {
        let durations_by_id: HashMap<&str, Duration> = units
            .iter()
            .filter_map(|u| u.total_duration().map(|d| (u.id.as_str(), d)))
            .collect();

        let mut stats = BatchStats {
            total_units: lifecycles.len(),
            ..Default::default()
        };

        let mut delivery_durations = Vec::new();
        let mut hold_durations = Vec::new();
        let mut failures_before_success: u64 = 0;
        let mut on_time = 0usize;

        for state in lifecycles {
            match state.status {
                UnitStatus::Success => stats.success_count += 1,
                UnitStatus::Failure => stats.failure_count += 1,
                UnitStatus::InProcess => stats.in_process_count += 1,
            }

            let total_duration = durations_by_id.get(state.unit_id.as_str()).copied();
            if state.status == UnitStatus::Success {
                if let Some(duration) = total_duration {
                    if duration <= Duration::days(SLA_DAYS) {
                        on_time += 1;
                    }
                    if duration >= Duration::zero() && duration <= Duration::days(MAX_ALLOWED_DAYS)
                    {
                        delivery_durations.push(duration);
                    }
                }
            }

            if state.recovered_after_failure {
                stats.recovered_after_failure_count += 1;
                failures_before_success += u64::from(state.failure_before_success_count);
            }

            if state.flag_seized {
                stats.in_customs_count += 1;
            } else if state.seized_at.is_some() && state.exited_at.is_some() {
                stats.exited_customs_count += 1;
                if let Some(hold) = state.hold_duration {
                    if hold > Duration::zero() {
                        hold_durations.push(hold);
                    }
                }
            }
            if state.alert_after_seizure {
                stats.customs_alert_count += 1;
            }

            if state.status == UnitStatus::Failure {
                stats.total_cities_after_failure += u64::from(state.cities_after_failure_count);
                stats.max_cities_after_failure = stats
                    .max_cities_after_failure
                    .max(state.cities_after_failure_count);
                if state.cities_after_failure_count > 0 {
                    stats.units_with_post_failure_movement += 1;
                }
            }
        }

        stats.done_count = stats.success_count + stats.failure_count;
        stats.success_rate_all = ratio(stats.success_count, stats.total_units);
        stats.failure_rate_all = ratio(stats.failure_count, stats.total_units);
        stats.success_rate_done = ratio(stats.success_count, stats.done_count);
        stats.on_time_delivery_rate = ratio(on_time, stats.total_units);
        stats.average_delivery_duration_seconds = mean_seconds(&delivery_durations);
        stats.median_delivery_duration_seconds = median_seconds(&delivery_durations);
        stats.recovery_rate_success = ratio(stats.recovered_after_failure_count, stats.success_count);
        stats.avg_failures_before_success = if stats.recovered_after_failure_count > 0 {
            round4(failures_before_success as f64 / stats.recovered_after_failure_count as f64)
        } else {
            0.0
        };
        stats.avg_customs_hold_seconds = mean_seconds(&hold_durations);
        stats.median_customs_hold_seconds = median_seconds(&hold_durations);
        stats.avg_cities_after_failure = if stats.failure_count > 0 {
            round4(stats.total_cities_after_failure as f64 / stats.failure_count as f64)
        } else {
            0.0
        };
        stats.pct_with_post_failure_movement =
            ratio(stats.units_with_post_failure_movement, stats.failure_count);

        stats
    }
}

// ==========================================
// TransitionReport
// ==========================================
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransitionReport {
    pub total_transitions: usize,
    pub late_transitions: usize,
    pub units_with_late_transitions: usize,
    pub late_rate: f64,
}

impl TransitionReport {
    pub fn compute(transitions: &[TransitionRecord]) -> Self {
        let late: Vec<&TransitionRecord> = transitions.iter().filter(|t| t.late).collect();
        let late_units: HashSet<&str> = late.iter().map(|t| t.unit_id.as_str()).collect();
        TransitionReport {
            total_transitions: transitions.len(),
            late_transitions: late.len(),
            units_with_late_transitions: late_units.len(),
            late_rate: ratio(late.len(), transitions.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Event;
    use crate::domain::types::UnitKind;
    use chrono::{TimeZone, Utc};

    fn unit_with_duration(id: &str, days: i64) -> Unit {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let event = Event {
            unit_id: id.to_string(),
            timestamp: start,
            event_type: "34".to_string(),
            office: None,
            next_office: None,
            country: Some("DZ".to_string()),
            duration_to_next_step: None,
            total_duration: Some(Duration::days(days)),
        };
        Unit::new(id, UnitKind::Item, vec![event])
    }

    fn success_state(id: &str) -> LifecycleState {
        LifecycleState {
            unit_id: id.to_string(),
            status: UnitStatus::Success,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_counts_and_rates() {
        let units = vec![
            unit_with_duration("A", 2),
            unit_with_duration("B", 20),
            unit_with_duration("C", 3),
        ];
        let mut failed = LifecycleState::new("C");
        failed.status = UnitStatus::Failure;
        failed.cities_after_failure_count = 2;
        let lifecycles = vec![success_state("A"), success_state("B"), failed];

        let stats = BatchStats::compute(&units, &lifecycles);
        assert_eq!(stats.total_units, 3);
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.done_count, 3);
        assert_eq!(stats.success_rate_all, 0.6667);
        // Only unit A delivered within the 15-day SLA.
        assert_eq!(stats.on_time_delivery_rate, 0.3333);
        assert_eq!(stats.units_with_post_failure_movement, 1);
        assert_eq!(stats.avg_cities_after_failure, 2.0);
    }

    #[test]
    fn test_transition_report() {
        let record = |unit: &str, late: bool| TransitionRecord {
            unit_id: unit.to_string(),
            origin_region: Some(16),
            dest_region: Some(31),
            actual_duration: Duration::days(3),
            allowed_duration: late.then(|| Duration::days(2)),
            late,
        };
        let transitions = vec![
            record("A", true),
            record("A", true),
            record("B", false),
            record("C", false),
        ];
        let report = TransitionReport::compute(&transitions);
        assert_eq!(report.total_transitions, 4);
        assert_eq!(report.late_transitions, 2);
        assert_eq!(report.units_with_late_transitions, 1);
        assert_eq!(report.late_rate, 0.5);
    }
}
