// ==========================================
// Postal Flow - office / region reference data
// ==========================================
// Read-only, fully-loaded-once lookup from office name to office and
// owning region (wilaya). Passed by reference into the engines; no
// ambient global state.
// ==========================================

use crate::domain::event::Event;
use crate::importer::error::{ImportError, ImportResult};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

// ==========================================
// Entities
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: u32,
    /// Wilaya code as used by the office table and duration matrix.
    pub code: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: u32,
    pub name: String,
    pub region_id: u32,
}

// ==========================================
// RegionResolver
// ==========================================
/// Case-insensitive office-name lookup over the loaded office table.
#[derive(Debug, Clone, Default)]
pub struct RegionResolver {
    offices: Vec<Office>,
    regions: HashMap<u32, Region>,
    /// Lowercased office name -> index into `offices`.
    by_name: HashMap<String, usize>,
}

impl RegionResolver {
    /// Build the resolver from (office name, wilaya code, region name)
    /// entries. The first entry wins on duplicate office names.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32, S)>,
        S: Into<String>,
    {
        let mut resolver = RegionResolver::default();
        let mut region_ids: HashMap<u32, u32> = HashMap::new();

        for (office_name, wilaya_code, region_name) in entries {
            let office_name = office_name.into();
            let region_name = region_name.into();

            let next_region_id = region_ids.len() as u32 + 1;
            let region_id = *region_ids.entry(wilaya_code).or_insert(next_region_id);
            resolver.regions.entry(region_id).or_insert(Region {
                id: region_id,
                code: wilaya_code,
                name: region_name,
            });

            let key = office_name.trim().to_lowercase();
            if key.is_empty() || resolver.by_name.contains_key(&key) {
                continue;
            }
            let office = Office {
                id: resolver.offices.len() as u32 + 1,
                name: office_name.trim().to_string(),
                region_id,
            };
            resolver.by_name.insert(key, resolver.offices.len());
            resolver.offices.push(office);
        }

        resolver
    }

    /// Load the office table from a CSV export with at least the
    /// columns `bp_nm` (office name) and `code_upw` (wilaya code);
    /// `wilaya_nm` is used as region name when present.
    pub fn load_csv(path: &Path) -> ImportResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let col = |name: &str| headers.iter().position(|h| h == name);
        let (name_idx, code_idx) = match (col("bp_nm"), col("code_upw")) {
            (Some(n), Some(c)) => (n, c),
            _ => {
                return Err(ImportError::MissingColumns(vec![
                    "bp_nm".to_string(),
                    "code_upw".to_string(),
                ]))
            }
        };
        let region_idx = col("wilaya_nm");

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let name = record.get(name_idx).unwrap_or("").trim().to_string();
            // Wilaya codes sometimes arrive as "16.0"; accept both forms.
            let code = record
                .get(code_idx)
                .and_then(|c| c.trim().parse::<f64>().ok())
                .map(|c| c as u32);
            let (name_ok, code) = match (name.is_empty(), code) {
                (false, Some(code)) => (name, code),
                _ => continue,
            };
            let region_name = region_idx
                .and_then(|i| record.get(i))
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| format!("Wilaya {}", code));
            entries.push((name_ok, code, region_name));
        }

        Ok(Self::from_entries(entries))
    }

    /// Case-insensitive lookup of an office and its owning region.
    pub fn resolve(&self, name: &str) -> Option<(&Office, &Region)> {
        let office = self
            .by_name
            .get(&name.trim().to_lowercase())
            .map(|&idx| &self.offices[idx])?;
        let region = self.regions.get(&office.region_id)?;
        Some((office, region))
    }

    /// Wilaya code of the office's region, for block grouping.
    pub fn region_code(&self, name: &str) -> Option<u32> {
        self.resolve(name).map(|(_, region)| region.code)
    }

    /// Resolve an office name, falling back to the nearest prior
    /// event's declared next-office when the name is missing or
    /// unresolvable. `events` must be the unit's sorted sequence.
    pub fn resolve_with_fallback(
        &self,
        name: Option<&str>,
        events: &[Event],
        at: DateTime<Utc>,
    ) -> Option<(&Office, &Region)> {
        if let Some(found) = name.and_then(|n| self.resolve(n)) {
            return Some(found);
        }
        let fallback = events
            .iter()
            .rev()
            .find(|e| e.timestamp < at)
            .and_then(|e| e.next_office.as_deref())?;
        self.resolve(fallback)
    }

    pub fn office_count(&self) -> usize {
        self.offices.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resolver() -> RegionResolver {
        RegionResolver::from_entries(vec![
            ("Alger CPX", 16, "Alger"),
            ("Centre Aéropostal HB", 16, "Alger"),
            ("Oran CTR", 31, "Oran"),
        ])
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolver = sample_resolver();
        let (office, region) = resolver.resolve("alger cpx").unwrap();
        assert_eq!(office.name, "Alger CPX");
        assert_eq!(region.code, 16);
        assert_eq!(region.name, "Alger");
    }

    #[test]
    fn test_unknown_office_is_unresolved() {
        let resolver = sample_resolver();
        assert!(resolver.resolve("Tlemcen BP").is_none());
        assert_eq!(resolver.region_code("Oran CTR"), Some(31));
    }

    #[test]
    fn test_offices_share_regions() {
        let resolver = sample_resolver();
        assert_eq!(resolver.office_count(), 3);
        assert_eq!(resolver.region_count(), 2);
        let (a, _) = resolver.resolve("Alger CPX").unwrap();
        let (b, _) = resolver.resolve("Centre Aéropostal HB").unwrap();
        assert_eq!(a.region_id, b.region_id);
    }
}
