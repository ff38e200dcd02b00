// ==========================================
// Postal Flow - SLA duration matrix
// ==========================================
// Region x region table of allowed transit durations, loaded once
// from a CSV matrix keyed by wilaya codes. No symmetry is enforced;
// entries are exactly what the table carries.
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::Duration;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Allowed transit duration per (origin, dest) canonical region pair.
#[derive(Debug, Clone, Default)]
pub struct DurationMatrix {
    entries: HashMap<(u32, u32), Duration>,
}

impl DurationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from explicit entries (tests, fixtures).
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ((u32, u32), Duration)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Load the matrix from a CSV file: first column holds the origin
    /// wilaya code, remaining headers are destination codes. Blank or
    /// unparseable cells stay unknown.
    pub fn load_csv(path: &Path) -> ImportResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        // Destination codes from the header row (first cell is the
        // origin-code column label).
        let dest_codes: Vec<Option<u32>> = reader
            .headers()?
            .iter()
            .skip(1)
            .map(parse_region_code)
            .collect();

        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let origin = match record.get(0).and_then(parse_region_code) {
                Some(code) => code,
                None => continue,
            };
            for (col, cell) in record.iter().skip(1).enumerate() {
                let dest = match dest_codes.get(col).copied().flatten() {
                    Some(code) => code,
                    None => continue,
                };
                if let Some(allowed) = parse_duration_cell(cell) {
                    entries.insert((origin, dest), allowed);
                }
            }
        }

        Ok(Self { entries })
    }

    /// Allowed duration for the (origin, dest) pair, or unknown.
    pub fn lookup(&self, origin: u32, dest: u32) -> Option<Duration> {
        self.entries.get(&(origin, dest)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_region_code(raw: &str) -> Option<u32> {
    // Codes sometimes arrive as "16.0" after spreadsheet round-trips.
    raw.trim().parse::<f64>().ok().map(|c| c as u32)
}

/// Parse one matrix cell. Numeric values are days; otherwise the cell
/// is a duration literal ("2 days 03:00:00", "2 days", "03:00:00").
fn parse_duration_cell(raw: &str) -> Option<Duration> {
    let cell = raw.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(days) = cell.parse::<f64>() {
        if !days.is_finite() || days < 0.0 {
            return None;
        }
        return Some(Duration::seconds((days * SECONDS_PER_DAY) as i64));
    }
    parse_duration_literal(cell)
}

fn parse_duration_literal(text: &str) -> Option<Duration> {
    let lowered = text.to_lowercase();
    let (days_part, time_part) = match lowered.split_once("day") {
        Some((days, rest)) => {
            let days = days.trim().parse::<i64>().ok()?;
            // Strip the "s" of "days" plus any separator before the clock.
            let rest = rest.trim_start_matches('s').trim();
            (days, if rest.is_empty() { None } else { Some(rest) })
        }
        None => (0, Some(lowered.as_str())),
    };

    let clock_seconds = match time_part {
        None => 0,
        Some(clock) => {
            let fields: Vec<&str> = clock.split(':').collect();
            if fields.len() != 3 {
                return None;
            }
            let hours = fields[0].trim().parse::<i64>().ok()?;
            let minutes = fields[1].trim().parse::<i64>().ok()?;
            let seconds = fields[2].trim().parse::<f64>().ok()? as i64;
            hours * 3600 + minutes * 60 + seconds
        }
    };

    Some(Duration::seconds(days_part * 86_400 + clock_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cell_is_days() {
        assert_eq!(parse_duration_cell("2"), Some(Duration::days(2)));
        assert_eq!(parse_duration_cell("1.5"), Some(Duration::hours(36)));
        assert_eq!(parse_duration_cell(""), None);
        assert_eq!(parse_duration_cell("  "), None);
    }

    #[test]
    fn test_duration_literal_cells() {
        assert_eq!(
            parse_duration_cell("2 days 03:00:00"),
            Some(Duration::days(2) + Duration::hours(3))
        );
        assert_eq!(parse_duration_cell("1 day 00:30:00"), Some(Duration::days(1) + Duration::minutes(30)));
        assert_eq!(parse_duration_cell("03:15:00"), Some(Duration::minutes(195)));
        assert_eq!(parse_duration_cell("garbage"), None);
    }

    #[test]
    fn test_lookup_is_directional() {
        let matrix = DurationMatrix::from_entries(vec![((16, 31), Duration::days(2))]);
        assert_eq!(matrix.lookup(16, 31), Some(Duration::days(2)));
        assert_eq!(matrix.lookup(31, 16), None);
    }
}
