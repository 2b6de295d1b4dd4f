//! The medication record produced by the parser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One medication found on a prescription.
///
/// Serialises with the field names consumers already rely on:
/// `name`, `dosage`, `frequency`, `instructions`, `parsed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRecord {
    /// Title-cased medication name.
    pub name: String,
    /// Quantity with unit, e.g. "500mg", or the unknown-dosage sentinel.
    pub dosage: String,
    /// Free-text frequency, or the unknown-frequency sentinel.
    pub frequency: String,
    /// `"Take {dosage} {frequency}"`.
    pub instructions: String,
    /// When the record was produced (UTC).
    #[serde(rename = "parsed_at")]
    pub extracted_at: DateTime<Utc>,
}

impl MedicationRecord {
    /// Build a record, synthesising `instructions` from dosage and frequency.
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        frequency: impl Into<String>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        let dosage = dosage.into();
        let frequency = frequency.into();
        Self {
            name: name.into(),
            instructions: format!("Take {dosage} {frequency}"),
            dosage,
            frequency,
            extracted_at,
        }
    }

    /// Whether two records describe the same medication, ignoring when each
    /// was produced.
    pub fn same_entry(&self, other: &Self) -> bool {
        self.name == other.name
            && self.dosage == other.dosage
            && self.frequency == other.frequency
            && self.instructions == other.instructions
    }
}
