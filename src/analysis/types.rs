//! Core types for image analysis.

use crate::error::{RepromptError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Parses a declared MIME type. Parameters such as `; charset=` are ignored.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An image to analyze, together with its declared format.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: Vec<u8>,
    format: ImageFormat,
}

impl ImagePayload {
    /// Creates a payload from raw bytes and a known format.
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        Self { data, format }
    }

    /// Creates a payload from raw bytes and a declared MIME type.
    pub fn with_mime_type(data: Vec<u8>, mime: &str) -> Result<Self> {
        let format = ImageFormat::from_mime_type(mime)
            .ok_or_else(|| RepromptError::UnsupportedMediaType(mime.to_string()))?;
        Ok(Self::new(data, format))
    }

    /// Creates a payload, detecting the format from magic bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data).ok_or_else(|| {
            RepromptError::UnsupportedMediaType("unrecognized image data".into())
        })?;
        Ok(Self::new(data, format))
    }

    /// Reads an image file. The format comes from the file contents, falling
    /// back to the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| RepromptError::UnsupportedMediaType(path.display().to_string()))?;
        Ok(Self::new(data, format))
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Declared image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Returns true if there are no image bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL, suitable for a preview.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("format", &self.format)
            .field("size", &self.data.len())
            .finish()
    }
}

/// The prompt the model reconstructed for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Best-effort reconstruction of the generation prompt.
    pub prompt: String,
}

impl AnalysisResult {
    /// Creates a new result.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a......"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(
            ImageFormat::from_mime_type("image/png"),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_mime_type("IMAGE/JPEG"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_mime_type("image/webp; q=1"),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
    }

    #[test]
    fn test_payload_rejects_unsupported_mime() {
        let err = ImagePayload::with_mime_type(vec![1, 2, 3], "image/gif").unwrap_err();
        assert!(matches!(err, RepromptError::UnsupportedMediaType(m) if m == "image/gif"));
    }

    #[test]
    fn test_payload_data_url() {
        let payload = ImagePayload::new(vec![0, 1, 2], ImageFormat::Png);
        assert_eq!(payload.to_base64(), "AAEC");
        assert_eq!(payload.to_data_url(), "data:image/png;base64,AAEC");
    }

    #[test]
    fn test_payload_from_path_uses_extension_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.webp");
        std::fs::write(&path, b"not really an image").unwrap();

        let payload = ImagePayload::from_path(&path).unwrap();
        assert_eq!(payload.format(), ImageFormat::WebP);
        assert_eq!(payload.size(), 19);

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            ImagePayload::from_path(&path),
            Err(RepromptError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_payload_debug_hides_bytes() {
        let payload = ImagePayload::new(PNG_MAGIC.to_vec(), ImageFormat::Png);
        let dbg = format!("{payload:?}");
        assert!(dbg.contains("size: 12"));
        assert!(!dbg.contains("137"));
    }

    #[test]
    fn test_result_serializes_single_field() {
        let json = serde_json::to_value(AnalysisResult::new("a red bicycle")).unwrap();
        assert_eq!(json, serde_json::json!({ "prompt": "a red bicycle" }));
    }
}
