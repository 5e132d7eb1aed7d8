//! Compressed blobs (`compfile`, type 1)
//!
//! A 16 byte header precedes the body: decompressed size at offset 0 and
//! compressed size at offset 8. A compressed size of all ones marks a body
//! stored as-is.

use crate::compression::{Decompressor, decompress};
use crate::error::{Error, Result};

pub const BLOB_HEADER_SIZE: usize = 16;
/// Compressed-size value meaning "not compressed".
pub const STORED_SENTINEL: u32 = u32::MAX;

/// Strip the header and decompress the body.
///
/// # Errors
/// Returns a format error for blobs shorter than the header, or a codec
/// error naming `name` when decompression fails.
pub fn decode_compressed_blob(data: &[u8], codec: &dyn Decompressor, name: &str) -> Result<Vec<u8>> {
    if data.len() < BLOB_HEADER_SIZE {
        return Err(Error::truncated(format!("compressed blob header of {name}")));
    }

    let word = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    let decompressed_size = word(0) as usize;
    let compressed_size = word(8);
    let body = &data[BLOB_HEADER_SIZE..];

    if compressed_size == STORED_SENTINEL {
        return Ok(body.to_vec());
    }

    let out = decompress(codec, body, decompressed_size, name)?;
    if out.is_empty() {
        return Err(Error::DecompressionFailed {
            name: name.to_string(),
            message: "empty result".to_string(),
        });
    }
    Ok(out)
}

/// Build a blob around `body`. `compressed` marks whether `body` is already
/// packed; `decompressed_size` is the size it unpacks to.
#[must_use]
pub fn encode_compressed_blob(body: &[u8], decompressed_size: usize, compressed: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(BLOB_HEADER_SIZE + body.len());
    out.extend_from_slice(&(decompressed_size as u64).to_le_bytes());
    let size_field = if compressed { body.len() as u64 } else { u64::MAX };
    out.extend_from_slice(&size_field.to_le_bytes());
    out.extend_from_slice(body);
    out
}
