// ==========================================
// Postal Flow - batch pipeline
// ==========================================
// Single-pass batch orchestration: normalize, then run every unit
// independently through lifecycle, alerts and transitions. A panic in
// one unit is contained: the unit is logged and excluded wholly, the
// batch carries on.
// ==========================================

use crate::domain::alert::{AlertKey, AlertOccurrence};
use crate::domain::transition::TransitionRecord;
use crate::domain::types::UnitKind;
use crate::domain::unit::{LifecycleState, Unit};
use crate::engine::alert_rules::AlertRuleEngine;
use crate::engine::lifecycle::LifecycleDeriver;
use crate::engine::transition::TransitionBuilder;
use crate::importer::file_parser::RowTable;
use crate::importer::metadata::BatchMetadata;
use crate::importer::normalizer::{EventNormalizer, NormalizedBatch};
use crate::importer::ImportResult;
use crate::reference::duration_matrix::DurationMatrix;
use crate::reference::region::RegionResolver;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info};

// ==========================================
// BatchOutput
// ==========================================
/// Everything one batch run derives, handed to the persistence
/// collaborator. This crate never writes storage itself.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub units: Vec<Unit>,
    pub lifecycles: Vec<LifecycleState>,
    pub alerts: Vec<AlertOccurrence>,
    pub transitions: Vec<TransitionRecord>,
    pub metadata: BatchMetadata,
    /// Units excluded after an unexpected processing failure.
    pub failed_units: Vec<String>,
}

// ==========================================
// BatchPipeline
// ==========================================
pub struct BatchPipeline<'a> {
    resolver: &'a RegionResolver,
    matrix: &'a DurationMatrix,
}

impl<'a> BatchPipeline<'a> {
    pub fn new(resolver: &'a RegionResolver, matrix: &'a DurationMatrix) -> Self {
        Self { resolver, matrix }
    }

    /// Normalize a tabular row set and run the full derivation.
    /// `existing_keys` is the set of already-persisted alert
    /// identities; emitted keys are added to it.
    pub fn process_table(
        &self,
        kind: UnitKind,
        table: &RowTable,
        now: DateTime<Utc>,
        existing_keys: &mut HashSet<AlertKey>,
    ) -> ImportResult<BatchOutput> {
        let batch = EventNormalizer::new(kind).normalize_table(table)?;
        Ok(self.run(batch, now, existing_keys))
    }

    /// Run the derivation over an already-normalized batch.
    pub fn run(
        &self,
        batch: NormalizedBatch,
        now: DateTime<Utc>,
        existing_keys: &mut HashSet<AlertKey>,
    ) -> BatchOutput {
        let deriver = LifecycleDeriver::new();
        let alert_engine = AlertRuleEngine::new(self.resolver);
        let transition_builder = TransitionBuilder::new(self.resolver, self.matrix);

        let mut output = BatchOutput {
            metadata: batch.metadata,
            ..Default::default()
        };

        for (unit_id, events) in batch.units {
            // Alerts dedup against a scratch copy so that a failed
            // unit leaves the shared key set untouched.
            let mut scratch_keys = existing_keys.clone();
            let result = catch_unwind(AssertUnwindSafe(|| {
                let lifecycle = deriver.derive(&unit_id, &events);
                let alerts = alert_engine.evaluate(&events, now, &mut scratch_keys);
                let transitions = transition_builder.build(&unit_id, &events);
                (lifecycle, alerts, transitions)
            }));

            match result {
                Ok((lifecycle, alerts, transitions)) => {
                    *existing_keys = scratch_keys;
                    output.lifecycles.push(lifecycle);
                    output.alerts.extend(alerts);
                    output.transitions.extend(transitions);
                    output.units.push(Unit::new(unit_id, batch.kind, events));
                }
                Err(_) => {
                    error!(unit_id = %unit_id, "unit processing panicked; unit excluded from batch");
                    output.failed_units.push(unit_id);
                }
            }
        }

        info!(
            units = output.units.len(),
            alerts = output.alerts.len(),
            transitions = output.transitions.len(),
            failed = output.failed_units.len(),
            "batch derivation complete"
        );
        output
    }
}
