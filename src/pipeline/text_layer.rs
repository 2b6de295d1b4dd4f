//! Text-layer strategies: read the text a PDF already carries.
//!
//! Two independent parsers are used because they fail on different
//! documents. `pdf-extract` handles most font encodings well but gives up on
//! some damaged cross-reference tables; `lopdf` is more forgiving about
//! structure but weaker on exotic encodings.

use crate::error::StrategyError;
use crate::pipeline::extract::{StrategyKind, TextStrategy};
use lopdf::Document as PdfDocument;
use tracing::debug;

/// Primary strategy: `pdf-extract` over every page, in page order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractTextLayer;

impl TextStrategy for PdfExtractTextLayer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NativeText
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
            StrategyError::PdfParse {
                detail: e.to_string(),
            }
        })?;
        debug!("pdf-extract read {} page(s)", pages.len());
        Ok(join_pages(pages))
    }
}

/// Secondary strategy: `lopdf` text extraction, page by page.
///
/// A page that fails to decode is skipped; the strategy only fails when the
/// document cannot be loaded or no page yields text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfTextLayer;

impl TextStrategy for LopdfTextLayer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SecondaryText
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        let doc = PdfDocument::load_mem(bytes).map_err(|e| StrategyError::PdfParse {
            detail: e.to_string(),
        })?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut last_error = None;

        for number in &page_numbers {
            match doc.extract_text(&[*number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    debug!("lopdf could not read page {}: {}", number, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if pages.is_empty() => Err(StrategyError::PdfParse {
                detail: e.to_string(),
            }),
            _ => Ok(join_pages(pages)),
        }
    }
}

/// Concatenate page texts in order, making sure each page ends a line.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::new();
    for page in pages {
        if page.is_empty() {
            continue;
        }
        out.push_str(&page);
        if !page.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
