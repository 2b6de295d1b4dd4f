//! Error types for the prescription-parser library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PrescriptionError`] — **Fatal**: the request cannot proceed at all
//!   (missing file, unsupported extension, oversized upload, bad config).
//!   Only the input/collaborator layer returns it; extraction and parsing
//!   never do.
//!
//! * [`StrategyError`] — **Non-fatal**: one text-extraction strategy failed
//!   (corrupt xref, OCR engine missing, render glitch). Recorded in
//!   [`crate::pipeline::extract::StrategyAttempt`] and logged, after which the
//!   extractor moves on to the next strategy.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the prescription-parser library.
///
/// Strategy-level failures use [`StrategyError`] and are absorbed by the
/// extractor rather than propagated here.
#[derive(Debug, Error)]
pub enum PrescriptionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The file extension is not one of the accepted prescription formats.
    #[error("Unsupported file type '{name}'\nAllowed extensions: pdf, png, jpg, jpeg")]
    UnsupportedFileType { name: String },

    /// The upload or download contained no bytes.
    #[error("Document '{name}' is empty")]
    EmptyDocument { name: String },

    /// The payload exceeds the configured maximum size.
    #[error("Document '{name}' is {size} bytes, over the {limit}-byte limit")]
    PayloadTooLarge { name: String, size: u64, limit: u64 },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pattern table entry failed to compile or lacks a required group.
    #[error("Invalid pattern '{label}': {detail}")]
    InvalidPattern { label: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of a single extraction strategy.
///
/// Stored in [`crate::pipeline::extract::StrategyAttempt`]. The extractor
/// continues with the next strategy; callers only ever see the final text.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum StrategyError {
    /// The PDF structure could not be parsed by this strategy's parser.
    #[error("PDF parsing failed: {detail}")]
    PdfParse { detail: String },

    /// PDFium could not be bound (library missing or incompatible).
    #[error("Failed to bind to pdfium library: {detail}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium.")]
    PdfiumBinding { detail: String },

    /// Rasterisation of a page failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Tesseract could not be initialised (missing tessdata, bad language).
    #[error("Tesseract initialisation failed: {detail}")]
    OcrInit { detail: String },

    /// Tesseract ran but recognition failed.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// The image bytes could not be decoded or re-encoded.
    #[error("Image decoding failed: {detail}")]
    ImageDecode { detail: String },

    /// A third-party engine panicked inside the strategy.
    #[error("Strategy panicked: {detail}")]
    Panicked { detail: String },

    /// The per-document wall-clock budget was exceeded.
    #[error("Extraction timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_too_large_display() {
        let e = PrescriptionError::PayloadTooLarge {
            name: "scan.png".into(),
            size: 20_000_000,
            limit: 16_777_216,
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.png"), "got: {msg}");
        assert!(msg.contains("16777216"), "got: {msg}");
    }

    #[test]
    fn unsupported_type_lists_allowed_extensions() {
        let e = PrescriptionError::UnsupportedFileType {
            name: "notes.docx".into(),
        };
        assert!(e.to_string().contains("pdf, png, jpg, jpeg"));
    }

    #[test]
    fn render_failed_display() {
        let e = StrategyError::RenderFailed {
            page: 3,
            detail: "bad bitmap".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert!(e.to_string().contains("bad bitmap"));
    }

    #[test]
    fn strategy_error_serialises() {
        let e = StrategyError::Timeout { secs: 120 };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("Timeout"));
        let back: StrategyError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, e);
    }
}
