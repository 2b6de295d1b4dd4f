//! Configuration types for prescription extraction and parsing.
//!
//! Two explicit values replace process-wide settings:
//!
//! * [`ExtractionConfig`] — thresholds and engine settings for the text
//!   extractor, plus the input limits applied before extraction.
//! * [`ParserConfig`] — pattern tables, keyword set and sentinels for the
//!   medication parser.
//!
//! Both are built via a builder that clamps numeric knobs and validates the
//! rest, so a misconfigured deployment fails at start-up rather than on the
//! first prescription.

use crate::error::PrescriptionError;
use crate::pipeline::patterns;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default upload/download size limit: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Configuration for the text extractor and input resolution.
///
/// # Example
/// ```rust
/// use prescription_parser::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .substantial_threshold(80)
///     .ocr_language("eng")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.substantial_threshold, 80);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Text with more than this many non-whitespace characters counts as
    /// substantial and stops the strategy chain. Default: 50.
    ///
    /// The boundary separates "extraction genuinely failed" from "document
    /// has little text". Raise it for templates with long printed headers
    /// that carry no medication data.
    pub substantial_threshold: usize,

    /// Scale applied when rasterising PDF pages for OCR. Range: 0.25–8.0.
    /// Default: 1.0 (the page's native resolution, one pixel per point).
    pub render_scale: f32,

    /// Tesseract language code(s), e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Directory holding `*.traineddata`. None uses Tesseract's default
    /// lookup (`TESSDATA_PREFIX`, then the compiled-in path).
    pub tessdata_dir: Option<PathBuf>,

    /// Path to libpdfium (file or directory). None falls back to
    /// `PDFIUM_LIB_PATH`, then the system library search path.
    pub pdfium_library_path: Option<PathBuf>,

    /// Wall-clock budget per document for async extraction, in seconds.
    /// Default: 120.
    pub timeout_secs: u64,

    /// Largest accepted upload or download. Default: 16 MiB.
    pub max_payload_bytes: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            substantial_threshold: 50,
            render_scale: 1.0,
            ocr_language: "eng".to_string(),
            tessdata_dir: None,
            pdfium_library_path: None,
            timeout_secs: 120,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            download_timeout_secs: 120,
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn substantial_threshold(mut self, chars: usize) -> Self {
        self.config.substantial_threshold = chars;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn max_payload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_payload_bytes = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PrescriptionError> {
        let c = &self.config;
        if c.ocr_language.trim().is_empty() {
            return Err(PrescriptionError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if !c.render_scale.is_finite() || c.render_scale <= 0.0 {
            return Err(PrescriptionError::InvalidConfig(format!(
                "Render scale must be positive, got {}",
                c.render_scale
            )));
        }
        if c.max_payload_bytes == 0 {
            return Err(PrescriptionError::InvalidConfig(
                "Maximum payload size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

/// One row of a structured pattern table.
///
/// `pattern` must define the named groups `name`, `dosage` and `frequency`.
/// A literal `{dosage}` is replaced by [`ParserConfig::dosage_pattern`].
/// It is compiled case-insensitive and multi-line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Short identifier used in logs, e.g. "dash-separated".
    pub label: String,
    /// Regular expression source.
    pub pattern: String,
}

impl PatternSpec {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
        }
    }
}

/// Configuration for the medication parser.
///
/// The defaults reproduce the built-in tables in [`crate::pipeline::patterns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Stage-1 patterns. Every pattern runs over the whole text and every
    /// match contributes a candidate.
    pub structured_patterns: Vec<PatternSpec>,

    /// Numeric quantity + unit. Used by the line fallback and substituted
    /// for every `{dosage}` slot in the structured patterns.
    pub dosage_pattern: String,

    /// Frequency sub-patterns for the line fallback, tried in order.
    pub frequency_patterns: Vec<String>,

    /// A fallback line must contain one of these (case-insensitive).
    pub keywords: Vec<String>,

    /// A fallback line must be longer than this many characters. Default: 10.
    pub min_line_chars: usize,

    /// Minimum medication-name length in characters. Default: 3.
    pub min_name_chars: usize,

    /// Dosage written when none is found. Default: "Not specified".
    pub unknown_dosage: String,

    /// Frequency written when none is found. Default: "As directed".
    pub unknown_frequency: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            structured_patterns: patterns::default_structured_patterns(),
            dosage_pattern: patterns::DOSAGE.to_string(),
            frequency_patterns: patterns::FREQUENCY
                .iter()
                .map(|p| p.to_string())
                .collect(),
            keywords: patterns::KEYWORDS.iter().map(|k| k.to_string()).collect(),
            min_line_chars: 10,
            min_name_chars: 3,
            unknown_dosage: "Not specified".to_string(),
            unknown_frequency: "As directed".to_string(),
        }
    }
}

impl ParserConfig {
    /// Create a new builder for `ParserConfig`.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ParserConfig`].
#[derive(Debug)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    /// Replace the whole Stage-1 table.
    pub fn structured_patterns(mut self, patterns: Vec<PatternSpec>) -> Self {
        self.config.structured_patterns = patterns;
        self
    }

    /// Append one pattern to the Stage-1 table.
    pub fn push_pattern(mut self, spec: PatternSpec) -> Self {
        self.config.structured_patterns.push(spec);
        self
    }

    pub fn dosage_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.dosage_pattern = pattern.into();
        self
    }

    pub fn frequency_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.frequency_patterns = patterns;
        self
    }

    /// Replace the keyword set. Keywords are stored lower-cased.
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords = keywords
            .into_iter()
            .map(|k| k.into().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn min_line_chars(mut self, n: usize) -> Self {
        self.config.min_line_chars = n;
        self
    }

    pub fn min_name_chars(mut self, n: usize) -> Self {
        self.config.min_name_chars = n.max(1);
        self
    }

    pub fn unknown_dosage(mut self, s: impl Into<String>) -> Self {
        self.config.unknown_dosage = s.into();
        self
    }

    pub fn unknown_frequency(mut self, s: impl Into<String>) -> Self {
        self.config.unknown_frequency = s.into();
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Regex compilation happens in [`crate::MedicationParser::new`], which
    /// reports bad patterns as [`PrescriptionError::InvalidPattern`].
    pub fn build(self) -> Result<ParserConfig, PrescriptionError> {
        let c = &self.config;
        if c.structured_patterns.is_empty() {
            return Err(PrescriptionError::InvalidConfig(
                "At least one structured pattern is required".into(),
            ));
        }
        if c.unknown_dosage.trim().is_empty() || c.unknown_frequency.trim().is_empty() {
            return Err(PrescriptionError::InvalidConfig(
                "Dosage and frequency sentinels must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
