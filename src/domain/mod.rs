// ==========================================
// Postal Flow - domain layer
// ==========================================
// Entities and value types; no I/O, no derivation logic.
// ==========================================

pub mod alert;
pub mod event;
pub mod transition;
pub mod types;
pub mod unit;

pub use alert::{AlertDefinition, AlertKey, AlertOccurrence, RuleCode, ALERT_DEFINITIONS};
pub use event::{Event, RawEventRow};
pub use transition::{Block, TransitionRecord};
pub use types::{UnitKind, UnitStatus};
pub use unit::{LifecycleState, Unit};

// ==========================================
// Serde helpers for chrono::Duration
// ==========================================
// Durations travel as whole seconds; the feed has second granularity.

pub(crate) mod serde_duration {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(de)?;
        Ok(Duration::seconds(secs))
    }
}

pub(crate) mod serde_duration_opt {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, ser: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => ser.serialize_some(&d.num_seconds()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<i64>::deserialize(de)?;
        Ok(secs.map(Duration::seconds))
    }
}
