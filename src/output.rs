//! Response envelopes returned to callers and printed by the CLI.

use crate::error::PrescriptionError;
use crate::medication::MedicationRecord;
use crate::pipeline::extract::Extraction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Successful processing of one prescription.
///
/// Serialises as
/// `{ success, extracted_text_length, medications_found, medications, processed_at }`.
/// `extracted_text_length` is omitted when the caller supplied text directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text_length: Option<usize>,
    pub medications_found: usize,
    pub medications: Vec<MedicationRecord>,
    pub processed_at: DateTime<Utc>,
    /// How the text was obtained. Kept out of the wire format.
    #[serde(skip)]
    pub extraction: Option<Extraction>,
}

impl ParseOutcome {
    /// Envelope for medications parsed from an extracted document.
    pub fn from_extraction(extraction: Extraction, medications: Vec<MedicationRecord>) -> Self {
        Self {
            success: true,
            extracted_text_length: Some(extraction.text_len()),
            medications_found: medications.len(),
            medications,
            processed_at: Utc::now(),
            extraction: Some(extraction),
        }
    }

    /// Envelope for medications parsed from caller-supplied text.
    pub fn from_text(medications: Vec<MedicationRecord>) -> Self {
        Self {
            success: true,
            extracted_text_length: None,
            medications_found: medications.len(),
            medications,
            processed_at: Utc::now(),
            extraction: None,
        }
    }
}

/// A request that could not be processed.
///
/// Serialises as `{ success: false, error, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOutcome {
    pub success: bool,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorOutcome {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&PrescriptionError> for ErrorOutcome {
    fn from(e: &PrescriptionError) -> Self {
        Self::new(e.to_string())
    }
}

/// Write the JSON envelope to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_outcome(
    outcome: &ParseOutcome,
    path: impl AsRef<Path>,
) -> Result<(), PrescriptionError> {
    let path = path.as_ref();
    let write_failed = |source: std::io::Error| PrescriptionError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(outcome)
        .map_err(|e| PrescriptionError::Internal(format!("Failed to serialise outcome: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    Ok(())
}
