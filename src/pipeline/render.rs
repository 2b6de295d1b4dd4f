//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! ## Why scale, not DPI?
//!
//! pdfium measures pages in points. A scale of 1.0 yields one pixel per
//! point (72 DPI), which is what scanned prescriptions were usually captured
//! at; raising the scale trades speed for OCR accuracy on small print.
//!
//! ## Binding
//!
//! The library is bound on every call, from the configured path, then
//! `PDFIUM_LIB_PATH`, then the system search path. A missing library is a
//! [`StrategyError::PdfiumBinding`], never a panic, so the extractor can
//! carry on with whatever text it already has.

use crate::config::ExtractionConfig;
use crate::error::StrategyError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Turns PDF bytes into page images, in page order.
pub trait PageRasterizer: Send + Sync {
    /// Returns `(page_index_0based, image)` tuples. Pages that fail to
    /// render are left out.
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<(usize, DynamicImage)>, StrategyError>;
}

/// [`PageRasterizer`] backed by pdfium-render.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
    scale: f32,
}

impl PdfiumRasterizer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            library_path: config.pdfium_library_path.clone(),
            scale: config.render_scale,
        }
    }

    fn bind(&self) -> Result<Pdfium, StrategyError> {
        let configured = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match configured {
            Some(path) => Pdfium::bind_to_library(library_file(&path)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| StrategyError::PdfiumBinding {
            detail: format!("{:?}", e),
        })?;

        Ok(Pdfium::new(bindings))
    }
}

/// A directory is expanded to the platform's library file name inside it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<(usize, DynamicImage)>, StrategyError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| StrategyError::PdfParse {
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("Rasterising {} page(s) at scale {}", total_pages, self.scale);

        let render_config = PdfRenderConfig::new().scale_page_by_factor(self.scale);
        let rendered = pages.iter().enumerate().map(|(idx, page)| {
            page.render_with_config(&render_config)
                .map(|bitmap| {
                    let image = bitmap.as_image();
                    debug!(
                        "Rendered page {} → {}x{} px",
                        idx + 1,
                        image.width(),
                        image.height()
                    );
                    image
                })
                .map_err(|e| format!("{:?}", e))
        });

        keep_rendered(rendered)
    }
}

/// Keep the pages that rendered, indexed from 0. Fails only when pages
/// existed and none rendered, naming the last page that failed.
fn keep_rendered<I>(pages: I) -> Result<Vec<(usize, DynamicImage)>, StrategyError>
where
    I: IntoIterator<Item = Result<DynamicImage, String>>,
{
    let mut results = Vec::new();
    let mut last_failure = None;

    for (idx, page) in pages.into_iter().enumerate() {
        match page {
            Ok(image) => results.push((idx, image)),
            Err(detail) => {
                warn!("Skipping page {}: {}", idx + 1, detail);
                last_failure = Some((idx + 1, detail));
            }
        }
    }

    match last_failure {
        Some((page, detail)) if results.is_empty() => Err(StrategyError::RenderFailed {
            page,
            detail: format!("no page could be rendered; last error: {detail}"),
        }),
        _ => Ok(results),
    }
}
