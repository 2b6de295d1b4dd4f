//! Prescription documents and their kind.

use crate::error::PrescriptionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// File extensions accepted as prescription documents.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// How a document's bytes should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Map a file extension (case-insensitive, no dot) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }

    /// Map a file name or path to a kind via its extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Map an HTTP `Content-Type` header value to a kind.
    ///
    /// Anything mentioning `pdf` is a PDF, anything mentioning `image` is an
    /// image.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("pdf") {
            Some(Self::Pdf)
        } else if ct.contains("image") {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = PrescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "image" | "img" => Ok(Self::Image),
            other => Self::from_extension(other).ok_or_else(|| {
                PrescriptionError::InvalidInput {
                    input: s.to_string(),
                }
            }),
        }
    }
}

/// Whether `name` carries one of [`ALLOWED_EXTENSIONS`].
pub fn allowed_file(name: &str) -> bool {
    DocumentKind::from_filename(name).is_some()
}

/// An in-memory prescription document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    bytes: Vec<u8>,
    kind: DocumentKind,
    name: Option<String>,
}

impl Document {
    /// Wrap raw bytes with an explicit kind. No validation is performed.
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self {
            bytes,
            kind,
            name: None,
        }
    }

    /// Validate an upload the way an HTTP front-end would: the filename must
    /// carry an allowed extension, the payload must be non-empty and within
    /// `max_bytes`.
    pub fn from_bytes(
        bytes: Vec<u8>,
        filename: &str,
        max_bytes: u64,
    ) -> Result<Self, PrescriptionError> {
        let kind = DocumentKind::from_filename(filename).ok_or_else(|| {
            PrescriptionError::UnsupportedFileType {
                name: filename.to_string(),
            }
        })?;
        if bytes.is_empty() {
            return Err(PrescriptionError::EmptyDocument {
                name: filename.to_string(),
            });
        }
        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(PrescriptionError::PayloadTooLarge {
                name: filename.to_string(),
                size,
                limit: max_bytes,
            });
        }
        Ok(Self::new(bytes, kind).with_name(filename))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Display name for logs; falls back to the kind.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.as_str())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
