//! Image file encoding for inline transport to the vision model.
//!
//! Reads raw bytes, base64-encodes them, and derives a MIME type from the
//! file extension. The result is embedded in the prompt as a
//! `data:<mime>;base64,<payload>` URL.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fs;
use std::path::Path;

use crate::model::EncodingError;

/// Extensions accepted as input images (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

const DEFAULT_MIME: &str = "image/jpeg";

/// An image ready to embed in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: &'static str,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// True when the path has one of the supported image extensions
/// (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// MIME type for a path's extension, `image/jpeg` when unrecognised.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => DEFAULT_MIME,
    }
}

/// Reads and encodes an image file.
///
/// # Errors
/// `EncodingError` if the file cannot be read.
pub fn encode_image(path: &Path) -> Result<EncodedImage, EncodingError> {
    let bytes = fs::read(path).map_err(|source| EncodingError {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(EncodedImage {
        data: BASE64.encode(bytes),
        mime_type: mime_type_for(path),
    })
}
