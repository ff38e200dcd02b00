// ==========================================
// Postal Flow - legacy region code canonicalization
// ==========================================
// The 2019/2021 administrative splits introduced wilaya codes 49..58.
// The duration matrix is keyed by the legacy 1..48 codes, so newer
// codes collapse onto their parent wilaya before lookup.
// ==========================================

/// (new code, canonical legacy code) pairs. Codes absent from the
/// table map to themselves.
const NEW_TO_OLD: &[(u32, u32)] = &[
    (49, 1),
    (50, 1),
    (51, 7),
    (52, 8),
    (53, 11),
    (54, 11),
    (55, 30),
    (56, 33),
    (57, 39),
    (58, 47),
];

/// Collapse a wilaya code onto its canonical legacy code.
pub fn canonical_region_code(code: u32) -> u32 {
    NEW_TO_OLD
        .iter()
        .find(|(new, _)| *new == code)
        .map(|(_, old)| *old)
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_codes_collapse() {
        assert_eq!(canonical_region_code(49), 1);
        assert_eq!(canonical_region_code(50), 1);
        assert_eq!(canonical_region_code(58), 47);
    }

    #[test]
    fn test_legacy_codes_pass_through() {
        assert_eq!(canonical_region_code(16), 16);
        assert_eq!(canonical_region_code(1), 1);
        assert_eq!(canonical_region_code(48), 48);
    }
}
