//! Medication parser: extracted text → deduplicated medication records.
//!
//! Two candidate stages feed one normalisation stage:
//!
//! 1. **Structured patterns** — every row of the Stage-1 table runs over the
//!    whole text; every match with a plausible name becomes a candidate.
//! 2. **Line fallback** — only when Stage 1 found nothing. Each line that is
//!    long enough and mentions a medication keyword is split at its first
//!    dash into name and remainder; dosage and frequency are then searched
//!    in the remainder.
//!
//! Stage 3 ([`crate::pipeline::normalize`]) de-duplicates and formats.
//! The parser never fails: unparseable text yields an empty list.

use crate::config::ParserConfig;
use crate::error::PrescriptionError;
use crate::medication::MedicationRecord;
use crate::pipeline::normalize;
use crate::pipeline::patterns::{PatternTables, DEFAULT_TABLES, RE_DASH};
use chrono::Utc;
use std::fmt;
use tracing::{debug, info};

/// Which heuristic produced a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource {
    /// A Stage-1 row, by label.
    Pattern(String),
    /// The line fallback, by 1-based line number in the trimmed text.
    Line { line: usize },
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(label) => write!(f, "pattern '{label}'"),
            Self::Line { line } => write!(f, "line {line}"),
        }
    }
}

/// A raw, not yet normalised medication guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub source: MatchSource,
}

/// Heuristic medication parser. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MedicationParser {
    config: ParserConfig,
    tables: PatternTables,
    keywords: Vec<String>,
}

impl Default for MedicationParser {
    fn default() -> Self {
        let config = ParserConfig::default();
        Self {
            keywords: lowered(&config.keywords),
            tables: DEFAULT_TABLES.clone(),
            config,
        }
    }
}

impl MedicationParser {
    /// Compile `config`'s pattern tables.
    pub fn new(config: ParserConfig) -> Result<Self, PrescriptionError> {
        let tables = PatternTables::compile(&config)?;
        Ok(Self {
            keywords: lowered(&config.keywords),
            tables,
            config,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `text` into medication records, in discovery order.
    pub fn parse(&self, text: &str) -> Vec<MedicationRecord> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Nothing to parse");
            return Vec::new();
        }

        let mut candidates = self.structured_candidates(text);
        if candidates.is_empty() {
            debug!("No structured matches, falling back to line scan");
            candidates = self.line_candidates(text);
        }

        let records = normalize::finalize(candidates, self.config.min_name_chars, Utc::now());
        info!(
            "Parsed {} medication(s) from {} chars",
            records.len(),
            text.chars().count()
        );
        records
    }

    /// Stage 1: every match of every structured pattern.
    pub fn structured_candidates(&self, text: &str) -> Vec<Candidate> {
        let mut out = Vec::new();
        for pattern in &self.tables.structured {
            for caps in pattern.regex.captures_iter(text) {
                let (Some(name), Some(dosage), Some(frequency)) =
                    (caps.name("name"), caps.name("dosage"), caps.name("frequency"))
                else {
                    continue;
                };
                let name = name.as_str().trim();
                if !normalize::is_valid_name(name, self.config.min_name_chars) {
                    continue;
                }
                out.push(Candidate {
                    name: name.to_string(),
                    dosage: dosage.as_str().trim().to_string(),
                    frequency: first_sentence(frequency.as_str().trim()).to_string(),
                    source: MatchSource::Pattern(pattern.label.clone()),
                });
            }
        }
        out
    }

    /// Stage 2: keyword-bearing lines split at their first dash.
    pub fn line_candidates(&self, text: &str) -> Vec<Candidate> {
        let mut out = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.chars().count() <= self.config.min_line_chars || !self.has_keyword(line) {
                continue;
            }

            let mut parts = RE_DASH.split(line);
            let name = parts.next().unwrap_or_default().trim();
            let rest: Vec<&str> = parts.collect();
            if rest.is_empty() {
                continue;
            }
            let rest = rest.join(" - ");
            let rest = rest.trim();

            if name.chars().count() < self.config.min_name_chars {
                continue;
            }

            let dosage = self
                .tables
                .dosage
                .find(rest)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| self.config.unknown_dosage.clone());
            let frequency = self
                .tables
                .frequency
                .iter()
                .find_map(|re| re.find(rest))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| self.config.unknown_frequency.clone());

            out.push(Candidate {
                name: name.to_string(),
                dosage,
                frequency,
                source: MatchSource::Line { line: idx + 1 },
            });
        }
        out
    }

    fn has_keyword(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

fn lowered(keywords: &[String]) -> Vec<String> {
    keywords.iter().map(|k| k.to_lowercase()).collect()
}

/// Text before the first period.
fn first_sentence(s: &str) -> &str {
    s.split('.').next().unwrap_or_default()
}
