// ==========================================
// Postal Flow - region blocks and transitions
// ==========================================
// Block: maximal run of consecutive events in one region.
// TransitionRecord: block-to-block hop with its SLA verdict.
// ==========================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Block
// ==========================================
/// A maximal run of a unit's consecutive events sharing one region
/// code. Revisiting a region later opens a new block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Region (wilaya) code from the office table; None when the
    /// offices of the run could not be mapped.
    pub region_code: Option<u32>,
    pub first_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
}

// ==========================================
// TransitionRecord
// ==========================================
/// One inter-block hop measured against the duration matrix.
/// `late` is only ever true when both durations are known; absence of
/// an SLA entry is not lateness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub unit_id: String,
    /// Canonical legacy region codes; None when unmappable.
    pub origin_region: Option<u32>,
    pub dest_region: Option<u32>,
    #[serde(with = "super::serde_duration")]
    pub actual_duration: Duration,
    #[serde(with = "super::serde_duration_opt")]
    pub allowed_duration: Option<Duration>,
    pub late: bool,
}
