//! Compression bridge
//!
//! Archives store most payloads compressed with a block codec whose
//! implementation lives outside this crate. The [`Decompressor`] trait is the
//! seam for that primitive; [`decompress`] and [`decompress_if_needed`] add the
//! buffer sizing and failure reporting every caller needs.

pub mod lz4;
pub mod oodle;

pub use lz4::Lz4Block;
pub use oodle::OodleLibrary;

use crate::error::{Error, Result};

/// Slack added to every output buffer; block codecs may write past the
/// declared size while finishing their last block.
pub const SAFE_SPACE: usize = 64;

/// An opaque block decompression primitive.
pub trait Decompressor: Send + Sync {
    /// Short codec name for logs.
    fn name(&self) -> &'static str;

    /// Decompress `compressed` into `output`, returning the number of bytes
    /// produced. `output` is at least `expected + SAFE_SPACE` bytes long.
    fn decompress_into(&self, compressed: &[u8], output: &mut [u8], expected: usize)
    -> Result<usize>;
}

/// Primitive used when no codec library could be loaded.
///
/// Stored (uncompressed) payloads never reach the codec, so archives can still
/// be exported partially without one.
#[derive(Debug, Clone, Default)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Decompressor for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn decompress_into(&self, _: &[u8], _: &mut [u8], _: usize) -> Result<usize> {
        let message = if self.reason.is_empty() {
            "no decompression library loaded".to_string()
        } else {
            self.reason.clone()
        };
        Err(Error::CodecUnavailable { message })
    }
}

/// Decompress `compressed` to exactly `expected` bytes.
///
/// # Errors
/// Returns [`Error::DecompressionFailed`] naming `name` if the primitive
/// fails or produces zero bytes, or [`Error::CodecUnavailable`] naming `name`
/// if there is no primitive.
pub fn decompress(
    codec: &dyn Decompressor,
    compressed: &[u8],
    expected: usize,
    name: &str,
) -> Result<Vec<u8>> {
    let mut output = vec![0u8; expected + SAFE_SPACE];

    let produced = match codec.decompress_into(compressed, &mut output, expected) {
        Ok(n) => n,
        Err(Error::CodecUnavailable { message }) => {
            return Err(Error::CodecUnavailable {
                message: format!("{name}: {message}"),
            });
        }
        Err(e) => {
            return Err(Error::DecompressionFailed {
                name: name.to_string(),
                message: format!("{}: {e}", codec.name()),
            });
        }
    };

    if produced == 0 {
        return Err(Error::DecompressionFailed {
            name: name.to_string(),
            message: format!("{} produced no output", codec.name()),
        });
    }

    output.truncate(produced.min(expected));
    Ok(output)
}

/// Return `data` untouched when it is already `expected` bytes long,
/// otherwise decompress it.
///
/// # Errors
/// Same as [`decompress`].
pub fn decompress_if_needed(
    codec: &dyn Decompressor,
    data: Vec<u8>,
    expected: usize,
    name: &str,
) -> Result<Vec<u8>> {
    if data.len() == expected {
        return Ok(data);
    }
    tracing::trace!("Decompressing {name}: {} -> {expected} bytes", data.len());
    decompress(codec, &data, expected, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ZeroOutput;

    impl Decompressor for ZeroOutput {
        fn name(&self) -> &'static str {
            "zero"
        }

        fn decompress_into(&self, _: &[u8], _: &mut [u8], _: usize) -> Result<usize> {
            Ok(0)
        }
    }

    struct Overrun;

    impl Decompressor for Overrun {
        fn name(&self) -> &'static str {
            "overrun"
        }

        fn decompress_into(&self, _: &[u8], output: &mut [u8], expected: usize) -> Result<usize> {
            assert!(output.len() >= expected + SAFE_SPACE);
            output.fill(7);
            Ok(expected + 10)
        }
    }

    #[test]
    fn test_zero_output_is_codec_error() {
        let err = decompress(&ZeroOutput, &[1, 2, 3], 16, "gfx/a.bimage").unwrap_err();
        match err {
            Error::DecompressionFailed { name, .. } => assert_eq!(name, "gfx/a.bimage"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_truncated_to_expected() {
        let out = decompress(&Overrun, &[0], 32, "x").unwrap();
        assert_eq!(out.len(), 32);
        assert!(out.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_matching_size_skips_codec() {
        let data = vec![1u8, 2, 3, 4];
        let out = decompress_if_needed(&ZeroOutput, data.clone(), 4, "x").unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_unavailable_codec() {
        let err = decompress(&Unavailable::default(), &[1], 8, "textures/a.tga").unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Codec);
        match err {
            Error::CodecUnavailable { message } => {
                assert!(message.starts_with("textures/a.tga: "), "{message}");
            }
            other => panic!("expected CodecUnavailable, got {other}"),
        }
    }
}
