// ==========================================
// Postal Flow - scan export file parser
// ==========================================
// Header-keyed CSV reading. Item exports are comma-separated,
// bag (receptacle) exports semicolon-separated.
// ==========================================

use crate::domain::event::RawEventRow;
use crate::domain::types::UnitKind;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

// ==========================================
// Column profiles
// ==========================================
/// Source column names per unit kind. The two feeds use slightly
/// different headers for the same concepts.
#[derive(Debug, Clone, Copy)]
pub struct ColumnProfile {
    pub identifier: &'static str,
    pub timestamp: &'static str,
    pub event_type: &'static str,
    pub office: &'static str,
    pub next_office: &'static str,
    pub local_event_name: Option<&'static str>,
}

impl ColumnProfile {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Item => ColumnProfile {
                identifier: "MAILITM_FID",
                timestamp: "date",
                event_type: "EVENT_TYPE_CD",
                office: "établissement_postal",
                next_office: "next_établissement_postal",
                local_event_name: None,
            },
            UnitKind::Bag => ColumnProfile {
                identifier: "RECPTCL_FID",
                timestamp: "date",
                event_type: "EVENT_TYPECD",
                office: "etablissement_postal",
                next_office: "nextetablissement_postal",
                local_event_name: Some("LOCAL_EVENT_TYPE_NM"),
            },
        }
    }

    /// Columns whose absence aborts the batch.
    pub fn required(&self) -> [&'static str; 3] {
        [self.identifier, self.timestamp, self.event_type]
    }
}

// ==========================================
// RowTable
// ==========================================
/// An already-tabular row set: headers plus one map per row. This is
/// the input contract of the normalizer; the CSV reader below is one
/// way to produce it.
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl RowTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Project rows onto RawEventRow using the kind's column profile.
    pub fn to_raw_rows(&self, kind: UnitKind) -> Vec<RawEventRow> {
        let profile = ColumnProfile::for_kind(kind);
        let field = |row: &HashMap<String, String>, col: &str| -> Option<String> {
            row.get(col)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty() && *v != "nan")
                .map(str::to_string)
        };
        self.rows
            .iter()
            .map(|row| RawEventRow {
                unit_id: field(row, profile.identifier).unwrap_or_default(),
                timestamp: field(row, profile.timestamp).unwrap_or_default(),
                event_type: field(row, profile.event_type),
                office: field(row, profile.office),
                next_office: field(row, profile.next_office),
                local_event_name: profile.local_event_name.and_then(|col| field(row, col)),
            })
            .collect()
    }
}

// ==========================================
// CSV parser
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// Parse a scan export into a RowTable, using the delimiter of the
    /// given unit kind. Fully blank rows are skipped.
    pub fn parse_file(path: &Path, kind: UnitKind) -> ImportResult<RowTable> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        Self::parse_reader(file, kind)
    }

    pub fn parse_reader<R: std::io::Read>(reader: R, kind: UnitKind) -> ImportResult<RowTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(kind.csv_delimiter())
            .flexible(true) // tolerate uneven row lengths
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row_map);
        }

        Ok(RowTable { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_csv() {
        let csv = "MAILITM_FID,date,EVENT_TYPE_CD,établissement_postal,next_établissement_postal\n\
                   RR1DZ,2025-03-01 08:00:00,34,Alger CPX,CTNI\n\
                   ,,,,\n\
                   RR1DZ,2025-03-02 08:00:00,37,Alger BP,\n";
        let table = CsvParser::parse_reader(csv.as_bytes(), UnitKind::Item).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.has_column("MAILITM_FID"));

        let raw = table.to_raw_rows(UnitKind::Item);
        assert_eq!(raw[0].unit_id, "RR1DZ");
        assert_eq!(raw[0].office.as_deref(), Some("Alger CPX"));
        assert_eq!(raw[1].next_office, None);
    }

    #[test]
    fn test_parse_bag_csv_uses_semicolon() {
        let csv = "RECPTCL_FID;date;EVENT_TYPECD;etablissement_postal;LOCAL_EVENT_TYPE_NM\n\
                   DZALGA123;2025-03-01 08:00:00;107;;Receptacle arrived\n";
        let table = CsvParser::parse_reader(csv.as_bytes(), UnitKind::Bag).unwrap();
        let raw = table.to_raw_rows(UnitKind::Bag);
        assert_eq!(raw[0].unit_id, "DZALGA123");
        assert_eq!(raw[0].office, None);
        assert_eq!(raw[0].local_event_name.as_deref(), Some("Receptacle arrived"));
    }

    #[test]
    fn test_nan_strings_become_none() {
        let csv = "MAILITM_FID,date,EVENT_TYPE_CD,établissement_postal\n\
                   RR1DZ,2025-03-01 08:00:00,34,nan\n";
        let table = CsvParser::parse_reader(csv.as_bytes(), UnitKind::Item).unwrap();
        let raw = table.to_raw_rows(UnitKind::Item);
        assert_eq!(raw[0].office, None);
    }
}
