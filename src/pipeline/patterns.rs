//! Declarative pattern tables for the medication parser.
//!
//! Every heuristic the parser applies is a row in one of these tables rather
//! than inline string manipulation, so a pattern can be tested on its own and
//! new document templates can be supported by adding a row.
//!
//! | Table | Used by | Shape |
//! |-------|---------|-------|
//! | [`default_structured_patterns`] | Stage 1 | `name`, `dosage`, `frequency` groups |
//! | [`DOSAGE`] | Stage 1 rows (via [`DOSAGE_SLOT`]), Stage 2 | number + unit token |
//! | [`FREQUENCY`] | Stage 2 | first match wins |
//! | [`KEYWORDS`] | Stage 2 | line filter |
//!
//! All patterns are compiled case-insensitive and multi-line.

use crate::config::{ParserConfig, PatternSpec};
use crate::error::PrescriptionError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Number (optionally decimal) followed by a unit from {mg, g, ml, unit(s)}.
pub const DOSAGE: &str = r"\d+(?:\.\d+)?\s*(?:mg|g|ml|units?)";

/// Placeholder in a structured row, replaced by the configured dosage
/// pattern before compilation.
pub const DOSAGE_SLOT: &str = "{dosage}";

/// Capitalised word run of 3–31 characters on a single line.
const NAME: &str = r"[A-Z][a-zA-Z \t]{2,30}";

/// Hyphen, en-dash or em-dash.
const DASH: &str = r"[-–—]";

/// Frequency sub-patterns for the line fallback, in priority order.
pub const FREQUENCY: [&str; 4] = [
    r"(?:once|twice|thrice)\s+(?:a\s+)?day",
    r"\d+\s+times?\s+(?:a\s+)?day",
    r"morning|evening|night",
    r"daily|weekly",
];

/// A fallback line must mention one of these to be considered.
pub const KEYWORDS: [&str; 10] = [
    "tablet", "capsule", "syrup", "mg", "ml", "once", "twice", "daily", "morning", "evening",
];

/// Named groups every structured pattern must define.
pub const REQUIRED_GROUPS: [&str; 3] = ["name", "dosage", "frequency"];

/// The built-in Stage-1 table.
pub fn default_structured_patterns() -> Vec<PatternSpec> {
    vec![
        // Metformin - 500mg - Take twice daily
        PatternSpec::new(
            "dash-separated",
            format!(
                r"(?P<name>\b{NAME})\s*{DASH}\s*(?P<dosage>{{dosage}})\s*{DASH}\s*(?P<frequency>[^.\n]+)"
            ),
        ),
        // 1. Aspirin 75mg Once daily
        PatternSpec::new(
            "numbered-list",
            format!(
                r"\d+\.\s*(?P<name>{NAME})\s+(?P<dosage>{{dosage}})\s+(?P<frequency>[^.\n]+)"
            ),
        ),
        // Amoxicillin (250mg) - three times a day
        PatternSpec::new(
            "parenthesized-dosage",
            format!(
                r"(?P<name>{NAME})\s*\((?P<dosage>{{dosage}})\)\s*{DASH}\s*(?P<frequency>[^.\n]+)"
            ),
        ),
    ]
}

/// Splits a fallback line into name and remainder.
pub static RE_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(DASH).unwrap());

/// Built-in tables, compiled once.
pub static DEFAULT_TABLES: Lazy<PatternTables> = Lazy::new(|| {
    PatternTables::compile(&ParserConfig::default()).expect("built-in pattern tables compile")
});

/// A compiled Stage-1 row.
#[derive(Debug, Clone)]
pub struct StructuredPattern {
    pub label: String,
    pub regex: Regex,
}

impl StructuredPattern {
    /// Compile a table row, checking that it defines every required group.
    /// Each [`DOSAGE_SLOT`] in the row becomes `dosage`.
    pub fn compile(spec: &PatternSpec, dosage: &str) -> Result<Self, PrescriptionError> {
        let source = spec.pattern.replace(DOSAGE_SLOT, &format!("(?:{dosage})"));
        let regex = compile(&source).map_err(|e| PrescriptionError::InvalidPattern {
            label: spec.label.clone(),
            detail: e.to_string(),
        })?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(missing) = REQUIRED_GROUPS.iter().find(|g| !names.contains(g)) {
            return Err(PrescriptionError::InvalidPattern {
                label: spec.label.clone(),
                detail: format!("missing named group '{missing}'"),
            });
        }

        Ok(Self {
            label: spec.label.clone(),
            regex,
        })
    }
}

/// Every table the parser needs, compiled.
#[derive(Debug, Clone)]
pub struct PatternTables {
    pub structured: Vec<StructuredPattern>,
    pub dosage: Regex,
    pub frequency: Vec<Regex>,
}

impl PatternTables {
    pub fn compile(config: &ParserConfig) -> Result<Self, PrescriptionError> {
        let structured = config
            .structured_patterns
            .iter()
            .map(|spec| StructuredPattern::compile(spec, &config.dosage_pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let dosage = compile(&config.dosage_pattern).map_err(|e| {
            PrescriptionError::InvalidPattern {
                label: "dosage".into(),
                detail: e.to_string(),
            }
        })?;

        let frequency = config
            .frequency_patterns
            .iter()
            .enumerate()
            .map(|(i, p)| {
                compile(p).map_err(|e| PrescriptionError::InvalidPattern {
                    label: format!("frequency[{i}]"),
                    detail: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            structured,
            dosage,
            frequency,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
}
