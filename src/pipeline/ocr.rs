//! OCR strategies: recognise text in images with Tesseract.
//!
//! [`OcrEngine`] is the seam between the extractor and Tesseract. The two
//! strategies built on it differ only in where the images come from:
//!
//! * [`RasterOcr`] renders each PDF page through a [`PageRasterizer`].
//! * [`ImageOcr`] decodes an uploaded PNG/JPEG.

use crate::config::ExtractionConfig;
use crate::error::StrategyError;
use crate::pipeline::encode::encode_png;
use crate::pipeline::extract::{StrategyKind, TextStrategy};
use crate::pipeline::render::PageRasterizer;
use image::DynamicImage;
use leptess::LepTess;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recognises text in a single image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, StrategyError>;
}

/// Tesseract via leptess.
///
/// A fresh `LepTess` handle is created per image: handles are not `Sync`,
/// and initialisation is cheap next to recognition itself.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractOcr {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            language: config.ocr_language.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
        }
    }

    fn engine(&self) -> Result<LepTess, StrategyError> {
        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(dir.to_str().ok_or_else(|| StrategyError::OcrInit {
                detail: format!("tessdata path is not valid UTF-8: {}", dir.display()),
            })?),
            None => None,
        };
        LepTess::new(datapath, &self.language).map_err(|e| StrategyError::OcrInit {
            detail: e.to_string(),
        })
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, StrategyError> {
        let png = encode_png(image).map_err(|e| StrategyError::ImageDecode {
            detail: e.to_string(),
        })?;

        let mut lt = self.engine()?;
        lt.set_image_from_mem(&png)
            .map_err(|e| StrategyError::OcrFailed {
                detail: format!("Failed to set image: {e}"),
            })?;
        lt.get_utf8_text().map_err(|e| StrategyError::OcrFailed {
            detail: format!("Failed to extract text: {e}"),
        })
    }
}

/// Rasterise every PDF page and OCR it, concatenating results in page order.
///
/// A page whose recognition fails is skipped. The strategy fails only if
/// rasterisation fails or every page does.
pub struct RasterOcr {
    rasterizer: Arc<dyn PageRasterizer>,
    engine: Arc<dyn OcrEngine>,
}

impl RasterOcr {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, engine: Arc<dyn OcrEngine>) -> Self {
        Self { rasterizer, engine }
    }
}

impl TextStrategy for RasterOcr {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PdfOcr
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        let pages = self.rasterizer.rasterize(bytes)?;
        let mut text = String::new();
        let mut last_error = None;
        let mut recognised = 0usize;

        for (idx, image) in &pages {
            match self.engine.recognize(image) {
                Ok(page_text) => {
                    debug!("OCR page {} → {} chars", idx + 1, page_text.chars().count());
                    text.push_str(&page_text);
                    recognised += 1;
                }
                Err(e) => {
                    warn!("OCR failed on page {}: {}", idx + 1, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if recognised == 0 => Err(e),
            _ => Ok(text),
        }
    }
}

/// OCR an uploaded image.
pub struct ImageOcr {
    engine: Arc<dyn OcrEngine>,
}

impl ImageOcr {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }
}

impl TextStrategy for ImageOcr {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImageOcr
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        let image = image::load_from_memory(bytes).map_err(|e| StrategyError::ImageDecode {
            detail: e.to_string(),
        })?;
        debug!("Decoded image {}x{}", image.width(), image.height());
        self.engine.recognize(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Reports each image's width as its "text".
    struct WidthOcr;

    impl OcrEngine for WidthOcr {
        fn recognize(&self, image: &DynamicImage) -> Result<String, StrategyError> {
            match image.width() {
                0..=1 => Err(StrategyError::OcrFailed {
                    detail: "blank page".into(),
                }),
                w => Ok(format!("page width {w}\n")),
            }
        }
    }

    struct FixedPages(Vec<u32>);

    impl PageRasterizer for FixedPages {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<(usize, DynamicImage)>, StrategyError> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, w)| (i, DynamicImage::ImageLuma8(GrayImage::new(*w, 4))))
                .collect())
        }
    }

    struct NoPdfium;

    impl PageRasterizer for NoPdfium {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<(usize, DynamicImage)>, StrategyError> {
            Err(StrategyError::PdfiumBinding {
                detail: "not installed".into(),
            })
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255])));
        encode_png(&img).unwrap()
    }

    #[test]
    fn raster_ocr_concatenates_in_page_order() {
        let s = RasterOcr::new(Arc::new(FixedPages(vec![10, 20])), Arc::new(WidthOcr));
        assert_eq!(s.extract(b"%PDF").unwrap(), "page width 10\npage width 20\n");
    }

    #[test]
    fn raster_ocr_skips_failed_pages() {
        let s = RasterOcr::new(Arc::new(FixedPages(vec![1, 30])), Arc::new(WidthOcr));
        assert_eq!(s.extract(b"%PDF").unwrap(), "page width 30\n");
    }

    #[test]
    fn raster_ocr_fails_when_every_page_fails() {
        let s = RasterOcr::new(Arc::new(FixedPages(vec![1, 1])), Arc::new(WidthOcr));
        assert!(matches!(s.extract(b"%PDF"), Err(StrategyError::OcrFailed { .. })));
    }

    #[test]
    fn raster_ocr_propagates_rasterizer_errors() {
        let s = RasterOcr::new(Arc::new(NoPdfium), Arc::new(WidthOcr));
        assert!(matches!(
            s.extract(b"%PDF"),
            Err(StrategyError::PdfiumBinding { .. })
        ));
    }

    #[test]
    fn image_ocr_decodes_then_recognises() {
        let s = ImageOcr::new(Arc::new(WidthOcr));
        assert_eq!(s.extract(&png(42, 8)).unwrap(), "page width 42\n");
    }

    #[test]
    fn image_ocr_rejects_undecodable_bytes() {
        let s = ImageOcr::new(Arc::new(WidthOcr));
        assert!(matches!(
            s.extract(b"definitely not an image"),
            Err(StrategyError::ImageDecode { .. })
        ));
    }

    #[test]
    fn tesseract_takes_language_from_config() {
        let config = ExtractionConfig::builder()
            .ocr_language("eng+fra")
            .tessdata_dir("/usr/share/tessdata")
            .build()
            .unwrap();
        let t = TesseractOcr::new(&config);
        assert_eq!(t.language, "eng+fra");
        assert_eq!(t.tessdata_dir, Some(PathBuf::from("/usr/share/tessdata")));
    }
}
