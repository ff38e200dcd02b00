// ==========================================
// Postal Flow - reference data layer
// ==========================================
// Read-only lookup tables loaded once per run: office/region table,
// SLA duration matrix, legacy region-code canonicalization.
// ==========================================

pub mod canonical;
pub mod duration_matrix;
pub mod region;

pub use canonical::canonical_region_code;
pub use duration_matrix::DurationMatrix;
pub use region::{Office, Region, RegionResolver};
