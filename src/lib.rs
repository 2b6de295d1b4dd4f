//! # prescription-parser
//!
//! Turn prescription PDFs and photos into a structured medication list
//! (name, dosage, frequency, instructions).
//!
//! ## Why a cascade?
//!
//! Prescriptions arrive as born-digital PDFs, PDFs wrapping a scan, and phone
//! photos. A text layer, when present, is fast and exact; OCR is slow and
//! noisy but works on anything. The extractor tries the cheap strategies
//! first and only falls back to OCR when they come up short. Parsing is
//! heuristic: a few pattern shapes cover most printed prescriptions, with a
//! keyword-driven line scan as a safety net.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   pdf-extract → lopdf → pdfium + Tesseract (images: Tesseract)
//!  ├─ 3. Parse     structured pattern table → line fallback
//!  ├─ 4. Normalise dedup by name, title-case, synthesise instructions
//!  └─ 5. Output    MedicationRecord list in a JSON envelope
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prescription_parser::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::default();
//!     let outcome = pipeline.process("prescription.pdf").await?;
//!     for med in &outcome.medications {
//!         println!("{} — {}", med.name, med.instructions);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Parsing alone needs no engines at all:
//!
//! ```rust
//! let meds = prescription_parser::parse_medications("Metformin - 500mg - Take twice daily");
//! assert_eq!(meds[0].name, "Metformin");
//! assert_eq!(meds[0].instructions, "Take 500mg Take twice daily");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rxparse` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! OCR needs Tesseract with language data (`TESSDATA_PREFIX` or
//! [`ExtractionConfig::tessdata_dir`]); scanned PDFs additionally need
//! libpdfium (`PDFIUM_LIB_PATH` or the system library path). Missing engines
//! only disable the strategies that need them.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod medication;
pub mod output;
pub mod pipeline;
pub mod process;
#[doc(hidden)]
pub mod test_support;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, ParserConfig, ParserConfigBuilder, PatternSpec,
};
pub use document::{allowed_file, Document, DocumentKind};
pub use error::{PrescriptionError, StrategyError};
pub use medication::MedicationRecord;
pub use output::{write_outcome, ErrorOutcome, ParseOutcome};
pub use pipeline::extract::{Extraction, Extractor, StrategyAttempt, StrategyKind, TextStrategy};
pub use pipeline::ocr::OcrEngine;
pub use pipeline::parse::MedicationParser;
pub use pipeline::render::PageRasterizer;
pub use process::{extract_text, parse_medications, process_sync, Pipeline};
