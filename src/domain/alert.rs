// ==========================================
// Postal Flow - alert entities and rule definitions
// ==========================================
// Eight fixed operational exception rules (ALR001..ALR008).
// Texts are the operational French wording, copied verbatim into
// every emitted occurrence.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Rule codes
// ==========================================
// Closed set: an unknown rule code is unrepresentable by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCode {
    /// Transmission with no reception at the destination within 3 days.
    Alr001,
    /// Reception with no delivery outcome within 24 hours.
    Alr002,
    /// Reception with no outcome nor customs exit within 15 days.
    Alr003,
    /// No onward movement from the air hub within 1 day.
    Alr004,
    /// Air hub -> Alger CPX dispatch not received within 2 days.
    Alr005,
    /// Alger CPX -> CTNI dispatch not received within 2 days.
    Alr006,
    /// No CPX/CTNI activity for more than 3 hours.
    Alr007,
    /// Reception with no onward movement within 4 days.
    Alr008,
}

impl RuleCode {
    pub const ALL: [RuleCode; 8] = [
        RuleCode::Alr001,
        RuleCode::Alr002,
        RuleCode::Alr003,
        RuleCode::Alr004,
        RuleCode::Alr005,
        RuleCode::Alr006,
        RuleCode::Alr007,
        RuleCode::Alr008,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleCode::Alr001 => "ALR001",
            RuleCode::Alr002 => "ALR002",
            RuleCode::Alr003 => "ALR003",
            RuleCode::Alr004 => "ALR004",
            RuleCode::Alr005 => "ALR005",
            RuleCode::Alr006 => "ALR006",
            RuleCode::Alr007 => "ALR007",
            RuleCode::Alr008 => "ALR008",
        }
    }

    /// Static definition text for this rule.
    pub fn definition(self) -> &'static AlertDefinition {
        &ALERT_DEFINITIONS[self as usize]
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Static rule-definition table
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDefinition {
    pub code: RuleCode,
    pub title: &'static str,
    pub trigger_condition: &'static str,
    pub severity: &'static str,
    pub action_required: &'static str,
}

/// Indexed by `RuleCode as usize`.
pub static ALERT_DEFINITIONS: [AlertDefinition; 8] = [
    AlertDefinition {
        code: RuleCode::Alr001,
        title: "Envois non réceptionnés après transmission",
        trigger_condition: "Envois transmis par un établissement (CDD/CTR/BP) vers un autre établissement et non scannés dans un délai de 3 jours.",
        severity: "Urgence",
        action_required: "Intervention immédiate auprès de l’établissement récepteur pour vérification et validation de la réception des envois.",
    },
    AlertDefinition {
        code: RuleCode::Alr002,
        title: "Envois en attente de distribution",
        trigger_condition: "Envois réceptionnés au niveau d’un établissement (BP ou CDD), sans événement de remise à l’agent de distribution ni échec de distribution dans un délai de 24h.",
        severity: "Urgence",
        action_required: "Rappel immédiat de l’établissement concerné pour initier le processus de distribution ou justifier le retard.",
    },
    AlertDefinition {
        code: RuleCode::Alr003,
        title: "Dépassement du délai de garde",
        trigger_condition: "Envois destinés à la distribution, présents au sein d’un établissement (BP ou CDD) depuis plus de 15 jours sans distribution ni réexpédition.",
        severity: "Urgence",
        action_required: "Vérification du statut des envois et déclenchement des mesures nécessaires (enregistrement de la distribution, réexpédition).",
    },
    AlertDefinition {
        code: RuleCode::Alr004,
        title: "Dépêche en attente de traitement – Centre Aéropostal HB",
        trigger_condition: "Dépêche postale réceptionnée par le Centre Aéropostal HB sans événement d’expédition vers le bureau suivant après 1 jour.",
        severity: "Urgence",
        action_required: "Interpellation immédiate du centre pour assurer le traitement de la dépêche.",
    },
    AlertDefinition {
        code: RuleCode::Alr005,
        title: "Dépêche non réceptionnée – Alger CPX",
        trigger_condition: "Dépêche expédiée par le Centre Aéropostal HB vers Alger CPX, non réceptionnée après 2 jours.",
        severity: "Urgence",
        action_required: "Vérification croisée entre les deux centres et enregistrement immédiat de la dépêche.",
    },
    AlertDefinition {
        code: RuleCode::Alr006,
        title: "Envois non réceptionnés – CTNI",
        trigger_condition: "Envois expédiés par Alger CPX vers le CTNI non réceptionnés après 2 jours.",
        severity: "Urgence",
        action_required: "Relance immédiate du CTNI et du centre émetteur pour localisation et régularisation.",
    },
    AlertDefinition {
        code: RuleCode::Alr007,
        title: "Incident d’exploitation – Absence d’événements",
        trigger_condition: "Aucune activité détectée pendant plus de 3 heures au niveau du CPX Alger ou du CTNI pendant les heures de fonctionnement.",
        severity: "Urgence",
        action_required: "Contact immédiat avec le centre concerné pour diagnostiquer un éventuel dysfonctionnement technique ou organisationnel.",
    },
    AlertDefinition {
        code: RuleCode::Alr008,
        title: "Délais de concentration excessifs",
        trigger_condition: "Envois réceptionnés dans un centre et non expédiés vers le prochain bureau dans un délai de 4 jours.",
        severity: "Urgence",
        action_required: "Enquête rapide sur les causes du retard et relance des opérations de traitement et d’acheminement.",
    },
];

// ==========================================
// Alert occurrence
// ==========================================
/// Identity of one alert; the deduplication key across runs and storage.
pub type AlertKey = (RuleCode, DateTime<Utc>, Option<u32>, Option<u32>);

/// One instance of a rule firing for a specific office/region/time.
/// Append-only; acknowledgement is a downstream concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOccurrence {
    pub code: RuleCode,
    pub title: String,
    pub trigger_condition: String,
    pub severity: String,
    pub action_required: String,
    pub office_id: Option<u32>,
    pub office_name: Option<String>,
    pub region_id: Option<u32>,
    pub region_name: Option<String>,
    /// Timestamp of the triggering event.
    pub timestamp: DateTime<Utc>,
}

impl AlertOccurrence {
    pub fn key(&self) -> AlertKey {
        (self.code, self.timestamp, self.office_id, self.region_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_table_is_aligned_with_codes() {
        for code in RuleCode::ALL {
            assert_eq!(code.definition().code, code);
        }
    }

    #[test]
    fn test_code_display() {
        assert_eq!(RuleCode::Alr001.to_string(), "ALR001");
        assert_eq!(RuleCode::Alr008.to_string(), "ALR008");
    }
}
