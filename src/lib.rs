// ==========================================
// Postal Flow - core library
// ==========================================
// Derivation pipeline for postal scan-event batches: per-unit
// lifecycle status, customs hold, operational alerts and inter-region
// transition compliance. Storage and HTTP surfaces are external
// collaborators; this crate only transforms in-memory batches.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and types
pub mod domain;

// Import layer - external data in
pub mod importer;

// Reference layer - read-only lookup data
pub mod reference;

// Engine layer - business rules
pub mod engine;

// Statistics - reductions over derived output
pub mod stats;

// Logging
pub mod logging;

// ==========================================
// Re-export core types
// ==========================================

// Domain types
pub use domain::{
    AlertKey, AlertOccurrence, Event, LifecycleState, RawEventRow, RuleCode, TransitionRecord,
    Unit, UnitKind, UnitStatus,
};

// Importer
pub use importer::{
    BatchMetadata, CsvParser, EventNormalizer, ImportError, ImportResult, NormalizedBatch,
    RowTable, UploadRecord,
};

// Reference data
pub use reference::{canonical_region_code, DurationMatrix, RegionResolver};

// Engines
pub use engine::{AlertRuleEngine, BatchOutput, BatchPipeline, LifecycleDeriver, TransitionBuilder};

// Statistics
pub use stats::{BatchStats, TransitionReport};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Postal Flow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
