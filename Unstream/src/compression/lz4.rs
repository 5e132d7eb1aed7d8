//! Raw LZ4 block primitive

use super::Decompressor;
use crate::error::{Error, Result};

/// LZ4 block codec (no frame, no size prefix).
///
/// Repacked mod archives use it in place of the vendor codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Block;

impl Lz4Block {
    /// Compress `data` as a raw LZ4 block.
    #[must_use]
    pub fn compress(data: &[u8]) -> Vec<u8> {
        lz4_flex::block::compress(data)
    }
}

impl Decompressor for Lz4Block {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn decompress_into(&self, compressed: &[u8], output: &mut [u8], _expected: usize) -> Result<usize> {
        lz4_flex::block::decompress_into(compressed, output)
            .map_err(|e| Error::InvalidFormat(format!("LZ4: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::decompress;

    #[test]
    fn test_lz4_block_through_bridge() {
        let original: Vec<u8> = b"streamed payload ".repeat(40);
        let packed = Lz4Block::compress(&original);
        assert!(packed.len() < original.len());

        let out = decompress(&Lz4Block, &packed, original.len(), "a").unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_corrupt_block_fails() {
        let err = decompress(&Lz4Block, &[0xF0, 0xFF, 0xFF], 64, "bad.bin").unwrap_err();
        assert!(err.to_string().contains("bad.bin"));
    }
}
