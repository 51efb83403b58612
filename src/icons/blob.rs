//! Icon Blob Module
//!
//! Decoded icon bytes and the revocable handles that point at them.

use serde::Serialize;

use crate::cache::EstimateSize;
use crate::error::{PoolError, Result};

/// URL scheme carried by every revocable handle.
pub const BLOB_SCHEME: &str = "blob:";

// == Icon Blob ==
/// Icon bytes whose image format has been recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconBlob {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl IconBlob {
    // == Decode ==
    /// Validates fetched bytes as an image and tags them with a MIME type.
    ///
    /// Empty bodies and unrecognised formats are decode failures.
    pub fn decode(url: &str, bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PoolError::Decode {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }

        match sniff_mime(&bytes) {
            Some(mime) => Ok(Self { bytes, mime }),
            None => Err(PoolError::Decode {
                url: url.to_string(),
                reason: "unrecognised image format".to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        Some("image/x-icon")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            Some("image/svg+xml")
        } else {
            None
        }
    }
}

// == Icon Handle ==
/// A local reference to decoded icon bytes. Must be released once it leaves
/// the icon pool through cleanup or clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconHandle {
    /// Handle URL, `blob:` scheme for revocable handles
    pub url: String,
    /// Number of decoded bytes kept alive by this handle
    pub byte_len: usize,
    pub mime: &'static str,
}

impl IconHandle {
    /// True when the handle points at a locally materialised blob.
    pub fn is_revocable(&self) -> bool {
        self.url.starts_with(BLOB_SCHEME)
    }
}

impl EstimateSize for IconHandle {
    /// Charged by the bytes the handle pins, not by its URL.
    fn estimated_size(&self) -> usize {
        self.byte_len
    }
}
