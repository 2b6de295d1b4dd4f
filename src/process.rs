//! End-to-end entry points: input → extraction → parsing → envelope.
//!
//! [`Pipeline`] owns everything a request needs, so one value can be shared
//! by many concurrent requests; nothing here holds mutable state.

use crate::config::{ExtractionConfig, ParserConfig};
use crate::document::{Document, DocumentKind};
use crate::error::PrescriptionError;
use crate::medication::MedicationRecord;
use crate::output::ParseOutcome;
use crate::pipeline::extract::{Extraction, Extractor};
use crate::pipeline::input;
use crate::pipeline::parse::MedicationParser;
use std::time::Instant;
use tracing::info;

/// Extract text from document bytes with the default configuration.
///
/// Never fails: returns `""` when every strategy comes up empty.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> String {
    Extractor::default().extract_bytes(bytes, kind).text
}

/// Parse medications from text with the default tables.
pub fn parse_medications(text: &str) -> Vec<MedicationRecord> {
    MedicationParser::default().parse(text)
}

/// Extractor + parser + input limits.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: ExtractionConfig,
    extractor: Extractor,
    parser: MedicationParser,
}

impl Pipeline {
    /// Build the standard pipeline from both configurations.
    ///
    /// # Errors
    /// [`PrescriptionError::InvalidPattern`] when a parser pattern does not
    /// compile or lacks a required group.
    pub fn new(
        extraction: ExtractionConfig,
        parser: ParserConfig,
    ) -> Result<Self, PrescriptionError> {
        let parser = MedicationParser::new(parser)?;
        Ok(Self {
            extractor: Extractor::new(&extraction),
            config: extraction,
            parser,
        })
    }

    /// Assemble a pipeline from pre-built parts, e.g. an extractor with stub
    /// strategies.
    pub fn from_parts(
        config: ExtractionConfig,
        extractor: Extractor,
        parser: MedicationParser,
    ) -> Self {
        Self {
            config,
            extractor,
            parser,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn parser(&self) -> &MedicationParser {
        &self.parser
    }

    /// Process a local file path or HTTP/HTTPS URL.
    ///
    /// # Errors
    /// Only input-resolution failures are errors. Extraction and parsing
    /// never fail; an unreadable document yields zero medications.
    pub async fn process(&self, input: &str) -> Result<ParseOutcome, PrescriptionError> {
        let document = input::resolve_input(input, &self.config).await?;
        Ok(self.process_document(document).await)
    }

    /// Process an already-loaded document.
    pub async fn process_document(&self, document: Document) -> ParseOutcome {
        let start = Instant::now();
        let name = document.name().to_string();
        let extraction = self.extractor.extract_with_budget(document).await;
        let medications = self.parser.parse(&extraction.text);

        info!(
            "Processed {}: {} chars, {} medication(s) in {}ms",
            name,
            extraction.text_len(),
            medications.len(),
            start.elapsed().as_millis()
        );
        ParseOutcome::from_extraction(extraction, medications)
    }

    /// Parse caller-supplied text, skipping extraction.
    pub fn process_text(&self, text: &str) -> ParseOutcome {
        ParseOutcome::from_text(self.parser.parse(text))
    }

    /// Resolve and extract without parsing.
    pub async fn extract(&self, input: &str) -> Result<Extraction, PrescriptionError> {
        let document = input::resolve_input(input, &self.config).await?;
        Ok(self.extractor.extract_with_budget(document).await)
    }
}

/// Synchronous wrapper around [`Pipeline::process`].
///
/// Creates a temporary tokio runtime internally. The runtime is shut down
/// in the background, so a strategy still running past the budget does not
/// hold the caller.
pub fn process_sync(input: &str, pipeline: &Pipeline) -> Result<ParseOutcome, PrescriptionError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| PrescriptionError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    let result = rt.block_on(pipeline.process(input));
    rt.shutdown_background();
    result
}
