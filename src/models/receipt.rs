use crate::error::SplitzyError;
use chrono::{DateTime, Utc};
use ethers::types::H256;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Webp,
}

impl ImageFormat {
    /// Detects the raster format from the payload's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'G', b'I', b'F', b'8', ..] => Some(Self::Gif),
            [b'B', b'M', ..] => Some(Self::Bmp),
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(Self::Tiff),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }
}

/// Raw receipt photo handed in by the caller.
#[derive(Clone)]
pub struct ReceiptImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ReceiptImage {
    pub fn new(bytes: Vec<u8>, max_bytes: usize) -> Result<Self, SplitzyError> {
        if bytes.is_empty() {
            return Err(SplitzyError::ExtractionFailure("image payload is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(SplitzyError::ExtractionFailure(format!(
                "image payload is {} bytes, limit is {}",
                bytes.len(),
                max_bytes
            )));
        }

        let format = ImageFormat::sniff(&bytes).ok_or_else(|| {
            SplitzyError::ExtractionFailure("unsupported image format".to_string())
        })?;

        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ReceiptImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptImage")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// OCR output. Noisy, mixed case, arbitrary line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedText(pub String);

impl RecognizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecognizedText {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: H256,
    pub status: ConfirmationStatus,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
    pub confirmed_at: DateTime<Utc>,
}

pub fn format_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}
