//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! Local files are typed by extension; downloads by `Content-Type`, falling
//! back to the URL's extension and finally to PDF. Both paths enforce the
//! configured size limit and reject empty payloads before any extraction
//! engine sees the bytes.

use crate::config::ExtractionConfig;
use crate::document::{Document, DocumentKind};
use crate::error::PrescriptionError;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory document.
pub async fn resolve_input(
    input: &str,
    config: &ExtractionConfig,
) -> Result<Document, PrescriptionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PrescriptionError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, config).await
    } else {
        resolve_local(input, config.max_payload_bytes).await
    }
}

/// Read a local file, validating extension, size and permissions.
async fn resolve_local(path_str: &str, max_bytes: u64) -> Result<Document, PrescriptionError> {
    let path = PathBuf::from(path_str);

    let kind = DocumentKind::from_filename(path_str).ok_or_else(|| {
        PrescriptionError::UnsupportedFileType {
            name: path_str.to_string(),
        }
    })?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| io_error(e, path.clone()))?;
    if !metadata.is_file() {
        return Err(PrescriptionError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    if metadata.len() > max_bytes {
        return Err(PrescriptionError::PayloadTooLarge {
            name: path_str.to_string(),
            size: metadata.len(),
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| io_error(e, path.clone()))?;
    if bytes.is_empty() {
        return Err(PrescriptionError::EmptyDocument {
            name: path_str.to_string(),
        });
    }

    debug!("Resolved local {}: {} ({} bytes)", kind, path.display(), bytes.len());
    Ok(Document::new(bytes, kind).with_name(path_str))
}

fn io_error(e: std::io::Error, path: PathBuf) -> PrescriptionError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => PrescriptionError::PermissionDenied { path },
        _ => PrescriptionError::FileNotFound { path },
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, config: &ExtractionConfig) -> Result<Document, PrescriptionError> {
    info!("Downloading prescription from: {}", url);
    let timeout_secs = config.download_timeout_secs;
    let failed = |reason: String| PrescriptionError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            PrescriptionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PrescriptionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    if let Some(len) = response.content_length() {
        if len > config.max_payload_bytes {
            return Err(PrescriptionError::PayloadTooLarge {
                name: url.to_string(),
                size: len,
                limit: config.max_payload_bytes,
            });
        }
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let kind = kind_for_download(url, content_type.as_deref());
    let filename = extract_filename(url, kind);

    // Content-Length may be absent (chunked), so the cap is enforced while reading.
    let bytes = read_capped(
        response.bytes_stream(),
        config.max_payload_bytes,
        &filename,
        classify,
    )
    .await?;
    if bytes.is_empty() {
        return Err(PrescriptionError::EmptyDocument { name: filename });
    }

    info!("Downloaded {} bytes ({})", bytes.len(), kind);
    Ok(Document::new(bytes, kind).with_name(filename))
}

/// Collect a response body, giving up as soon as it passes `limit` bytes.
async fn read_capped<S, B, E>(
    body: S,
    limit: u64,
    name: &str,
    on_error: impl Fn(E) -> PrescriptionError,
) -> Result<Vec<u8>, PrescriptionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    futures::pin_mut!(body);
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(&on_error)?;
        let chunk = chunk.as_ref();
        let size = buf.len() as u64 + chunk.len() as u64;
        if size > limit {
            return Err(PrescriptionError::PayloadTooLarge {
                name: name.to_string(),
                size,
                limit,
            });
        }
        buf.extend_from_slice(chunk);
    }
    Ok(buf)
}

/// Decide the kind of a downloaded document.
///
/// `Content-Type` wins; otherwise the URL's extension; otherwise PDF.
pub fn kind_for_download(url: &str, content_type: Option<&str>) -> DocumentKind {
    content_type
        .and_then(DocumentKind::from_content_type)
        .or_else(|| url_extension(url).and_then(|ext| DocumentKind::from_extension(&ext)))
        .unwrap_or(DocumentKind::Pdf)
}

fn url_extension(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Extract a reasonable filename from the URL.
fn extract_filename(url: &str, kind: DocumentKind) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    match kind {
        DocumentKind::Pdf => "downloaded.pdf".to_string(),
        DocumentKind::Image => "downloaded.jpg".to_string(),
    }
}
