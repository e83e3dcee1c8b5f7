//! # Cache Record Format
//!
//! Binary encoding of a memoized result.
//!
//! Format: Header (5 bytes) + postcard-serialized value.
//! - 4 bytes: Magic ("KQLC")
//! - 1 byte: Version
//!
//! The header is validated before the payload is touched, so a foreign or
//! truncated file is reported instead of being decoded as garbage.

use crate::{KernqlError, primitives};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Minimum valid record size (header only).
const HEADER_SIZE: usize = 5;

// =============================================================================
// RECORD HEADER
// =============================================================================

/// The header preceding every cache record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl RecordHeader {
    /// A header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), KernqlError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(KernqlError::IoError(
                "Invalid cache record magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(KernqlError::IoError(format!(
                "Unsupported cache record version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KernqlError> {
        if bytes.len() < HEADER_SIZE {
            return Err(KernqlError::IoError(
                "Cache record too short: minimum 5 bytes required".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode a value as header + payload. Pure, no file I/O.
pub fn encode_record<T: Serialize>(value: &T) -> Result<Vec<u8>, KernqlError> {
    let payload = postcard::to_stdvec(value)
        .map_err(|e| KernqlError::IoError(format!("Failed to encode cache record: {}", e)))?;

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&RecordHeader::new().to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a record produced by `encode_record`. Pure, no file I/O.
pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, KernqlError> {
    let header = RecordHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..])
        .map_err(|e| KernqlError::IoError(format!("Failed to decode cache record: {}", e)))
}
