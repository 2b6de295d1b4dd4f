//! Pipeline stages for prescription parsing.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested alone and any engine can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──────────────────────────────▶ parse ──▶ normalize
//! (path/URL)  │ text_layer (pdf-extract, lopdf)       (patterns)  (dedup)
//!             │ render + encode + ocr (pdfium, tesseract)
//! ```
//!
//! 1. [`input`]     — read a local file or download a URL into a `Document`
//! 2. [`extract`]   — walk the strategy chain for the document kind until the
//!    text is substantial
//! 3. [`text_layer`] — read an existing PDF text layer
//! 4. [`render`]    — rasterise PDF pages; [`encode`] turns them into PNG
//! 5. [`ocr`]       — Tesseract over rendered pages or uploaded images
//! 6. [`parse`]     — structured patterns, then the line fallback
//! 7. [`normalize`] — dedup, title-case, instructions
//!
//! [`patterns`] holds the declarative regex tables used by [`parse`].

pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod ocr;
pub mod parse;
pub mod patterns;
pub mod render;
pub mod text_layer;
