//! Text extraction: document bytes → best-effort plain text.
//!
//! Each document kind has an ordered chain of [`TextStrategy`] values.
//! The extractor walks the chain, appending what each strategy returns, and
//! stops as soon as the accumulated text is substantial:
//!
//! ```text
//! PDF:   native text layer ─▶ lopdf text layer ─▶ rasterise + OCR
//! Image: OCR
//! ```
//!
//! A strategy that errors or panics is logged and skipped. Extraction never
//! fails; when every strategy comes up empty the result is `""`.
//!
//! ## Why a budget?
//!
//! Tesseract on a large scanned PDF can run for minutes. The async entry point
//! [`Extractor::extract_with_budget`] runs the chain on the blocking pool and
//! gives up after `timeout_secs`, yielding empty text rather than stalling the
//! caller.

use crate::config::ExtractionConfig;
use crate::document::{Document, DocumentKind};
use crate::error::StrategyError;
use crate::pipeline::ocr::{ImageOcr, OcrEngine, RasterOcr, TesseractOcr};
use crate::pipeline::render::PdfiumRasterizer;
use crate::pipeline::text_layer::{LopdfTextLayer, PdfExtractTextLayer};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Identifies a strategy in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// pdf-extract over the PDF's text layer.
    NativeText,
    /// lopdf's structural text extraction.
    SecondaryText,
    /// PDFium rasterisation followed by Tesseract.
    PdfOcr,
    /// Tesseract on an uploaded image.
    ImageOcr,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NativeText => "native-text",
            Self::SecondaryText => "secondary-text",
            Self::PdfOcr => "pdf-ocr",
            Self::ImageOcr => "image-ocr",
        })
    }
}

/// One way of turning document bytes into text.
///
/// Implementations are synchronous and may block; the extractor takes care
/// of moving them off the async runtime.
pub trait TextStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn extract(&self, bytes: &[u8]) -> Result<String, StrategyError>;
}

/// Outcome of running one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    /// Characters contributed (0 on failure).
    pub chars: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StrategyError>,
}

/// Extracted text plus a record of how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    pub kind: DocumentKind,
    pub attempts: Vec<StrategyAttempt>,
    /// Set when the whole run was abandoned (timeout, task failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<StrategyError>,
    pub duration_ms: u64,
}

impl Extraction {
    fn empty(kind: DocumentKind) -> Self {
        Self {
            text: String::new(),
            kind,
            attempts: Vec::new(),
            aborted: None,
            duration_ms: 0,
        }
    }

    fn abandoned(kind: DocumentKind, error: StrategyError, elapsed: Duration) -> Self {
        Self {
            aborted: Some(error),
            duration_ms: elapsed.as_millis() as u64,
            ..Self::empty(kind)
        }
    }

    /// Character count of the extracted text.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The last strategy that contributed text, if any.
    pub fn final_strategy(&self) -> Option<StrategyKind> {
        self.attempts
            .iter()
            .rev()
            .find(|a| a.chars > 0)
            .map(|a| a.strategy)
    }
}

/// Count of non-whitespace characters.
pub fn content_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Runs the strategy chains. Cheap to clone.
#[derive(Clone)]
pub struct Extractor {
    threshold: usize,
    timeout_secs: u64,
    pdf_chain: Vec<Arc<dyn TextStrategy>>,
    image_chain: Vec<Arc<dyn TextStrategy>>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = |chain: &[Arc<dyn TextStrategy>]| {
            chain.iter().map(|s| s.kind()).collect::<Vec<_>>()
        };
        f.debug_struct("Extractor")
            .field("threshold", &self.threshold)
            .field("timeout_secs", &self.timeout_secs)
            .field("pdf_chain", &kinds(&self.pdf_chain))
            .field("image_chain", &kinds(&self.image_chain))
            .finish()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl Extractor {
    /// Build the standard chains: pdf-extract, lopdf, then PDFium + Tesseract
    /// for PDFs; Tesseract alone for images.
    ///
    /// Engines are bound lazily, so construction never fails even when
    /// libpdfium or tessdata are missing.
    pub fn new(config: &ExtractionConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new(config));
        Self::with_ocr_engine(config, ocr)
    }

    /// Standard chains with a caller-supplied OCR engine.
    pub fn with_ocr_engine(config: &ExtractionConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        let rasterizer = Arc::new(PdfiumRasterizer::new(config));
        Self::from_strategies(
            config,
            vec![
                Arc::new(PdfExtractTextLayer),
                Arc::new(LopdfTextLayer),
                Arc::new(RasterOcr::new(rasterizer, Arc::clone(&ocr))),
            ],
            vec![Arc::new(ImageOcr::new(ocr))],
        )
    }

    /// Arbitrary chains, run in the given order.
    pub fn from_strategies(
        config: &ExtractionConfig,
        pdf_chain: Vec<Arc<dyn TextStrategy>>,
        image_chain: Vec<Arc<dyn TextStrategy>>,
    ) -> Self {
        Self {
            threshold: config.substantial_threshold,
            timeout_secs: config.timeout_secs,
            pdf_chain,
            image_chain,
        }
    }

    /// Whether `text` has more than the threshold of non-whitespace chars.
    pub fn is_substantial(&self, text: &str) -> bool {
        content_chars(text) > self.threshold
    }

    /// Extract text from a document. Never fails.
    pub fn extract(&self, document: &Document) -> String {
        self.extract_bytes(document.bytes(), document.kind()).text
    }

    /// Extract text from raw bytes, keeping the per-strategy report.
    pub fn extract_bytes(&self, bytes: &[u8], kind: DocumentKind) -> Extraction {
        let start = Instant::now();
        if bytes.is_empty() {
            debug!("Empty {} payload, skipping extraction", kind);
            return Extraction::empty(kind);
        }

        let chain = match kind {
            DocumentKind::Pdf => &self.pdf_chain,
            DocumentKind::Image => &self.image_chain,
        };

        let mut extraction = Extraction::empty(kind);
        for strategy in chain {
            if self.is_substantial(&extraction.text) {
                break;
            }
            let attempt = run_strategy(strategy.as_ref(), bytes, &mut extraction.text);
            extraction.attempts.push(attempt);
        }

        extraction.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} chars from {} in {}ms ({} strategies tried)",
            extraction.text_len(),
            kind,
            extraction.duration_ms,
            extraction.attempts.len()
        );
        extraction
    }

    /// Run extraction on the blocking pool under the configured wall-clock
    /// budget. A timed-out or crashed run yields empty text.
    pub async fn extract_with_budget(&self, document: Document) -> Extraction {
        let kind = document.kind();
        let budget = Duration::from_secs(self.timeout_secs);
        let start = Instant::now();
        let extractor = self.clone();

        let task = tokio::task::spawn_blocking(move || {
            extractor.extract_bytes(document.bytes(), document.kind())
        });

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => {
                warn!("Extraction task failed: {}", e);
                Extraction::abandoned(
                    kind,
                    StrategyError::Panicked {
                        detail: e.to_string(),
                    },
                    start.elapsed(),
                )
            }
            Err(_) => {
                warn!(
                    "Extraction exceeded {}s budget, returning empty text",
                    self.timeout_secs
                );
                Extraction::abandoned(
                    kind,
                    StrategyError::Timeout {
                        secs: self.timeout_secs,
                    },
                    start.elapsed(),
                )
            }
        }
    }
}

/// Run one strategy, appending its text to `acc`. Panics are caught.
fn run_strategy(strategy: &dyn TextStrategy, bytes: &[u8], acc: &mut String) -> StrategyAttempt {
    let kind = strategy.kind();
    let start = Instant::now();
    debug!("Trying {}", kind);

    let result = panic::catch_unwind(AssertUnwindSafe(|| strategy.extract(bytes)))
        .unwrap_or_else(|payload| {
            Err(StrategyError::Panicked {
                detail: panic_message(payload.as_ref()),
            })
        });
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(text) => {
            let chars = text.chars().count();
            debug!("{} produced {} chars in {}ms", kind, chars, duration_ms);
            acc.push_str(&text);
            StrategyAttempt {
                strategy: kind,
                chars,
                duration_ms,
                error: None,
            }
        }
        Err(e) => {
            warn!("{} failed: {}", kind, e);
            StrategyAttempt {
                strategy: kind,
                chars: 0,
                duration_ms,
                error: Some(e),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
