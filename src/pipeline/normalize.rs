//! Normalisation: turn raw candidates into final medication records.
//!
//! Rules (applied in order):
//! 1. Drop candidates whose name is too short or has no letters
//! 2. De-duplicate by case-folded, trimmed name (first occurrence wins)
//! 3. Title-case the name
//! 4. Synthesise instructions and stamp the record
//!
//! Each rule is a pure function so it can be tested on its own.

use crate::medication::MedicationRecord;
use crate::pipeline::parse::Candidate;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Apply every normalisation rule to `candidates`, preserving discovery order.
pub fn finalize(
    candidates: Vec<Candidate>,
    min_name_chars: usize,
    parsed_at: DateTime<Utc>,
) -> Vec<MedicationRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if !is_valid_name(&candidate.name, min_name_chars) {
            debug!("Dropping candidate '{}' ({})", candidate.name, candidate.source);
            continue;
        }
        if !seen.insert(dedup_key(&candidate.name)) {
            debug!("Duplicate medication '{}' ignored", candidate.name.trim());
            continue;
        }
        records.push(MedicationRecord::new(
            title_case(candidate.name.trim()),
            candidate.dosage,
            candidate.frequency,
            parsed_at,
        ));
    }

    records
}

// ── Rule 1: Name validity ───────────────────────────────────────────────────

/// A name is usable when its trimmed form has at least `min_chars`
/// characters and contains a letter.
pub fn is_valid_name(name: &str, min_chars: usize) -> bool {
    let name = name.trim();
    name.chars().count() >= min_chars && name.chars().any(char::is_alphabetic)
}

// ── Rule 2: De-duplication key ───────────────────────────────────────────────

pub fn dedup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ── Rule 3: Title case ───────────────────────────────────────────────────────

/// Upper-case every letter that follows a non-letter, lower-case the rest.
///
/// `"METFORMIN hcl"` → `"Metformin Hcl"`, `"co-amoxiclav"` → `"Co-Amoxiclav"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
