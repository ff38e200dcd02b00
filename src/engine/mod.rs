// ==========================================
// Postal Flow - engine layer
// ==========================================
// Business rules: lifecycle derivation, alert rules, transitions,
// batch orchestration. Pure transformation over in-memory batches;
// no storage access.
// ==========================================

pub mod alert_rules;
pub mod lifecycle;
pub mod pipeline;
pub mod transition;

pub use alert_rules::AlertRuleEngine;
pub use lifecycle::LifecycleDeriver;
pub use pipeline::{BatchOutput, BatchPipeline};
pub use transition::TransitionBuilder;
