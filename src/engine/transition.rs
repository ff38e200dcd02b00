// ==========================================
// Postal Flow - transition builder
// ==========================================
// Groups a unit's events into consecutive same-region blocks and
// measures each block-to-block hop against the SLA duration matrix.
// ==========================================

use crate::domain::event::Event;
use crate::domain::transition::{Block, TransitionRecord};
use crate::reference::canonical::canonical_region_code;
use crate::reference::duration_matrix::DurationMatrix;
use crate::reference::region::RegionResolver;

pub struct TransitionBuilder<'a> {
    resolver: &'a RegionResolver,
    matrix: &'a DurationMatrix,
}

impl<'a> TransitionBuilder<'a> {
    pub fn new(resolver: &'a RegionResolver, matrix: &'a DurationMatrix) -> Self {
        Self { resolver, matrix }
    }

    /// Build the region blocks of one unit's sorted event sequence.
    /// Consecutive events sharing a region code merge into one block;
    /// revisiting a region later opens a new block.
    pub fn build_blocks(&self, events: &[Event]) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for event in events {
            let code = event
                .office
                .as_deref()
                .and_then(|name| self.resolver.region_code(name));
            match blocks.last_mut() {
                Some(current) if current.region_code == code => {
                    current.last_time = event.timestamp;
                }
                _ => blocks.push(Block {
                    region_code: code,
                    first_time: event.timestamp,
                    last_time: event.timestamp,
                }),
            }
        }
        blocks
    }

    /// Emit one TransitionRecord per adjacent block pair. A unit with
    /// a single block produces no transitions.
    pub fn build(&self, unit_id: &str, events: &[Event]) -> Vec<TransitionRecord> {
        let blocks = self.build_blocks(events);
        let mut records = Vec::new();

        for pair in blocks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let origin = prev.region_code.map(canonical_region_code);
            let dest = next.region_code.map(canonical_region_code);
            let actual = next.first_time - prev.last_time;

            let allowed = match (origin, dest) {
                (Some(origin), Some(dest)) => self.matrix.lookup(origin, dest),
                _ => None,
            };
            // Absence of an SLA entry is not lateness.
            let late = allowed.map(|allowed| actual > allowed).unwrap_or(false);

            records.push(TransitionRecord {
                unit_id: unit_id.to_string(),
                origin_region: origin,
                dest_region: dest,
                actual_duration: actual,
                allowed_duration: allowed,
                late,
            });
        }
        records
    }
}
