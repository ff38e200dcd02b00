// ==========================================
// Postal Flow - domain type definitions
// ==========================================
// Scan-event code table and unit-level enums shared
// by the normalizer and the derivation engines.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Unit kind (mail item vs mail bag)
// ==========================================
// The two kinds share the whole event shape; they differ only in
// identifier shape check, country derivation and CSV delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Mail item (MAILITM_FID, country = trailing 2 letters)
    Item,
    /// Mail bag / receptacle (RECPTCL_FID, country = leading 2 letters)
    Bag,
}

impl UnitKind {
    /// CSV delimiter used by the source export for this kind.
    pub fn csv_delimiter(self) -> u8 {
        match self {
            UnitKind::Item => b',',
            UnitKind::Bag => b';',
        }
    }

    /// Kind-specific identifier shape check. Rows failing it are dropped.
    pub fn identifier_is_valid(self, id: &str) -> bool {
        match self {
            // Item ids must end in two letters (the ISO country suffix).
            UnitKind::Item => {
                let tail: Vec<char> = id.chars().rev().take(2).collect();
                tail.len() == 2 && tail.iter().all(|c| c.is_ascii_alphabetic())
            }
            UnitKind::Bag => id.chars().count() >= 2,
        }
    }

    /// Country code derived from the unit identifier.
    pub fn derive_country(self, id: &str) -> Option<String> {
        if !self.identifier_is_valid(id) {
            return None;
        }
        match self {
            UnitKind::Item => {
                let chars: Vec<char> = id.chars().collect();
                Some(chars[chars.len() - 2..].iter().collect())
            }
            UnitKind::Bag => Some(id.chars().take(2).collect()),
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Item => write!(f, "item"),
            UnitKind::Bag => write!(f, "bag"),
        }
    }
}

// ==========================================
// Unit lifecycle status
// ==========================================
// Serialized form matches the historical storage values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    InProcess,
    Success,
    Failure,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::InProcess => write!(f, "in_process"),
            UnitStatus::Success => write!(f, "success"),
            UnitStatus::Failure => write!(f, "failure"),
        }
    }
}

// ==========================================
// Scan-event code table
// ==========================================
// Codes are kept as strings: the feed is not guaranteed numeric and
// unknown codes must pass through untouched.

/// Delivery succeeded.
pub const EVENT_SUCCESS: &str = "37";
/// Delivery attempt failed.
pub const EVENT_FAILURE: &str = "36";
/// In-transit city hop (also counts as a transmission).
pub const EVENT_TRANSIT_CITY: &str = "32";
/// Bag reception; a blank office falls back to the bag's country code.
pub const EVENT_BAG_ARRIVAL: &str = "107";

/// Transmission-type codes (unit handed over towards a next office).
pub const TRANSMISSION_CODES: &[&str] = &["32", "33"];
/// Reception-type codes (unit scanned in at an office).
pub const RECEPTION_CODES: &[&str] = &["34", "35"];
/// All customs-related codes.
pub const CUSTOMS_CODES: &[&str] = &["4", "6", "7", "31", "38"];
/// Customs entry / hold codes.
pub const CUSTOMS_ENTRY_CODES: &[&str] = &["4", "6", "31"];
/// Customs exit / release codes.
pub const CUSTOMS_EXIT_CODES: &[&str] = &["7", "38"];

pub fn is_success(code: &str) -> bool {
    code == EVENT_SUCCESS
}

pub fn is_failure(code: &str) -> bool {
    code == EVENT_FAILURE
}

pub fn is_transmission(code: &str) -> bool {
    TRANSMISSION_CODES.contains(&code)
}

pub fn is_reception(code: &str) -> bool {
    RECEPTION_CODES.contains(&code)
}

pub fn is_customs(code: &str) -> bool {
    CUSTOMS_CODES.contains(&code)
}

pub fn is_customs_entry(code: &str) -> bool {
    CUSTOMS_ENTRY_CODES.contains(&code)
}

pub fn is_customs_exit(code: &str) -> bool {
    CUSTOMS_EXIT_CODES.contains(&code)
}
