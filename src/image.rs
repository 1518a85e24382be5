use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::PipelineError;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Image encodings accepted by the caption stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detects the encoding from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(JPEG_MAGIC) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }

    /// MIME type of the encoding.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// A validated, non-empty JPEG or PNG image ready to be sent to a vision model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImagePayload {
    /// Validates raw image bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, PipelineError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PipelineError::InvalidInput("image payload is empty".into()));
        }

        let format = ImageFormat::sniff(&bytes).ok_or_else(|| {
            PipelineError::InvalidInput("unsupported image encoding, expected JPEG or PNG".into())
        })?;

        Ok(Self { bytes, format })
    }

    /// Decodes a base64 image as sent by browsers, with or without a
    /// `data:image/...;base64,` prefix.
    pub fn from_base64(encoded: &str) -> Result<Self, PipelineError> {
        let encoded = encoded.trim();
        let data = match encoded.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| PipelineError::InvalidInput("data URL is not base64".into()))?,
            None => encoded,
        };

        let bytes = STANDARD
            .decode(data)
            .map_err(|e| PipelineError::InvalidInput(format!("invalid base64 image: {e}")))?;

        Self::from_bytes(bytes)
    }

    /// Detected encoding.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Raw image bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the image in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a constructed payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 text as carried in the model server's `images` field.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}
