//! Image containers (`BIM`, type 21)
//!
//! The entry payload is a 63 byte header followed by one 36 byte record per
//! mip. Any bytes after the mip table are inline pixel data. The largest mip
//! (record 0) is usually streamed from a shard.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use ddsfile::DxgiFormat;

use crate::compression::{Decompressor, decompress_if_needed};
use crate::error::{Error, Result};
use crate::streamdb::ShardSet;

pub const IMAGE_MAGIC: &[u8; 3] = b"BIM";
pub const IMAGE_HEADER_SIZE: usize = 63;
pub const MIP_RECORD_SIZE: usize = 36;

/// Texture formats found in image containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Rgba32F,
    Rgba16F,
    Rgba8,
    Bc1,
    Bc2,
    Bc3,
    Bc3YCoCg,
    Bc3Normal,
    Bc6hUnsigned,
    Bc6hSigned,
    Bc7,
    Bc4,
    Bc5,
}

impl ImageFormat {
    /// Map a raw format code.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedTextureFormat`] for unknown codes.
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            1 => Self::Rgba32F,
            2 => Self::Rgba16F,
            3 => Self::Rgba8,
            10 => Self::Bc1,
            11 => Self::Bc2,
            12 => Self::Bc3,
            13 => Self::Bc3YCoCg,
            14 => Self::Bc3Normal,
            19 => Self::Bc6hUnsigned,
            20 => Self::Bc6hSigned,
            21 => Self::Bc7,
            24 => Self::Bc4,
            25 => Self::Bc5,
            format => return Err(Error::UnsupportedTextureFormat { format }),
        })
    }

    #[must_use]
    pub fn dxgi(self) -> DxgiFormat {
        match self {
            Self::Rgba32F => DxgiFormat::R32G32B32A32_Float,
            Self::Rgba16F => DxgiFormat::R16G16B16A16_Float,
            Self::Rgba8 => DxgiFormat::R8G8B8A8_UNorm,
            Self::Bc1 => DxgiFormat::BC1_UNorm,
            Self::Bc2 => DxgiFormat::BC2_UNorm,
            Self::Bc3 | Self::Bc3YCoCg | Self::Bc3Normal => DxgiFormat::BC3_UNorm,
            Self::Bc6hUnsigned => DxgiFormat::BC6H_UF16,
            Self::Bc6hSigned => DxgiFormat::BC6H_SF16,
            Self::Bc7 => DxgiFormat::BC7_UNorm,
            Self::Bc4 => DxgiFormat::BC4_UNorm,
            Self::Bc5 => DxgiFormat::BC5_UNorm,
        }
    }
}

/// One mip record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MipInfo {
    pub mip_level: i64,
    pub width: i32,
    pub height: i32,
    pub unknown_flag: i32,
    pub decompressed_size: i32,
    pub is_compressed: bool,
    pub compressed_size: i32,
    pub cumulative_size: i32,
}

/// Parsed image container header
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    pub version: u8,
    pub texture_type: i32,
    pub material_kind: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub mip_count: i32,
    pub mip_level: i64,
    pub is_environment_map: bool,
    pub texture_format: i32,
    pub is_streamed: bool,
    pub no_mips: bool,
    pub fft_bloom: bool,
    pub stream_db_mip_count: i32,
    pub mips: Vec<MipInfo>,
    /// Offset of the first byte after the mip table
    pub data_start: usize,
}

impl ImageHeader {
    /// Parse the header and mip table of an image payload.
    pub fn parse(data: &[u8], name: &str) -> Result<Self> {
        let invalid = |message: String| Error::InvalidImageHeader {
            name: name.to_string(),
            message,
        };

        if data.len() < IMAGE_HEADER_SIZE {
            return Err(invalid(format!("{} bytes, header needs {IMAGE_HEADER_SIZE}", data.len())));
        }
        if &data[..3] != IMAGE_MAGIC {
            return Err(invalid("missing BIM magic".to_string()));
        }

        let mut c = Cursor::new(&data[3..IMAGE_HEADER_SIZE]);
        let version = c.read_u8()?;
        let texture_type = c.read_i32::<LittleEndian>()?;
        let material_kind = c.read_i32::<LittleEndian>()?;
        let width = c.read_i32::<LittleEndian>()?;
        let height = c.read_i32::<LittleEndian>()?;
        let depth = c.read_i32::<LittleEndian>()?;
        let mip_count = c.read_i32::<LittleEndian>()?;
        let mip_level = c.read_i64::<LittleEndian>()?;
        let _unknown = c.read_f32::<LittleEndian>()?;
        let is_environment_map = c.read_u8()? != 0;
        let texture_format = c.read_i32::<LittleEndian>()?;
        let _always_seven = c.read_i32::<LittleEndian>()?;
        let _padding = c.read_i32::<LittleEndian>()?;
        let _atlas_padding = c.read_i16::<LittleEndian>()?;
        let is_streamed = c.read_u8()? != 0;
        let _unknown = c.read_u8()?;
        let no_mips = c.read_u8()? != 0;
        let fft_bloom = c.read_u8()? != 0;
        let stream_db_mip_count = c.read_i32::<LittleEndian>()?;

        let mip_total = usize::try_from(mip_count)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| invalid(format!("mip count {mip_count}")))?;
        let data_start = mip_total
            .checked_mul(MIP_RECORD_SIZE)
            .and_then(|n| n.checked_add(IMAGE_HEADER_SIZE))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| invalid(format!("{mip_total} mip records exceed payload")))?;

        let mut c = Cursor::new(&data[IMAGE_HEADER_SIZE..data_start]);
        let mut mips = Vec::with_capacity(mip_total);
        for _ in 0..mip_total {
            mips.push(MipInfo {
                mip_level: c.read_i64::<LittleEndian>()?,
                width: c.read_i32::<LittleEndian>()?,
                height: c.read_i32::<LittleEndian>()?,
                unknown_flag: c.read_i32::<LittleEndian>()?,
                decompressed_size: c.read_i32::<LittleEndian>()?,
                is_compressed: c.read_i32::<LittleEndian>()? != 0,
                compressed_size: c.read_i32::<LittleEndian>()?,
                cumulative_size: c.read_i32::<LittleEndian>()?,
            });
        }

        Ok(Self {
            version,
            texture_type,
            material_kind,
            width,
            height,
            depth,
            mip_count,
            mip_level,
            is_environment_map,
            texture_format,
            is_streamed,
            no_mips,
            fft_bloom,
            stream_db_mip_count,
            mips,
            data_start,
        })
    }

    /// The largest mip.
    #[must_use]
    pub fn top_mip(&self) -> &MipInfo {
        &self.mips[0]
    }

    /// Whether the top mip lives in a shard. A compressed top mip counts as
    /// streamed even when the header flag says otherwise.
    #[must_use]
    pub fn is_streamed(&self) -> bool {
        self.is_streamed || self.top_mip().is_compressed
    }

    pub fn format(&self) -> Result<ImageFormat> {
        ImageFormat::from_code(self.texture_format)
    }
}

/// Where the top mip bytes come from.
pub enum ImageSource<'a> {
    /// Look the mip up in shards by the entry's identity hash
    Streamed {
        shards: &'a ShardSet,
        stream_hash: u64,
    },
    /// The mip follows the header in the same flat file
    InPlace { trailing: &'a [u8] },
}

/// The decoded top mip plus the header describing it.
#[derive(Debug, Clone)]
pub struct ReconstructedImage {
    pub header: ImageHeader,
    pub format: ImageFormat,
    pub pixels: Vec<u8>,
}

/// Fetch and decompress the top mip of an image payload.
///
/// # Errors
/// Returns a format error for malformed headers, a resolution miss when a
/// streamed mip is in no shard, or a codec error.
pub fn reconstruct_image(
    header_bytes: &[u8],
    source: &ImageSource<'_>,
    codec: &dyn Decompressor,
    name: &str,
) -> Result<ReconstructedImage> {
    let header = ImageHeader::parse(header_bytes, name)?;
    let format = header.format()?;
    let top = *header.top_mip();
    let expected = usize::try_from(top.decompressed_size).unwrap_or(0);
    let inline = &header_bytes[header.data_start..];

    let pixels = if expected > 0 && inline.len() >= expected {
        inline[..expected].to_vec()
    } else {
        match source {
            ImageSource::InPlace { trailing } if trailing.len() >= expected => {
                trailing[..expected].to_vec()
            }
            ImageSource::InPlace { trailing } => {
                let stored_len = usize::try_from(top.compressed_size).unwrap_or(0);
                let stored = trailing.get(..stored_len).ok_or_else(|| {
                    Error::truncated(format!("{name}: top mip of {stored_len} bytes"))
                })?;
                decompress_if_needed(codec, stored.to_vec(), expected, name)?
            }
            ImageSource::Streamed {
                shards,
                stream_hash,
            } => {
                if !header.is_streamed() {
                    return Err(Error::InvalidImageHeader {
                        name: name.to_string(),
                        message: "not streamed and no inline pixel data".to_string(),
                    });
                }
                shards.resolve(codec, name, *stream_hash, header.stream_db_mip_count, expected)?
            }
        }
    };

    Ok(ReconstructedImage {
        header,
        format,
        pixels,
    })
}

/// Serialize an image header with one mip record per `(width, height,
/// decompressed, compressed)` tuple. Used to build fixtures.
#[must_use]
pub fn build_image_header(
    width: i32,
    height: i32,
    texture_format: i32,
    is_streamed: bool,
    stream_db_mip_count: i32,
    mips: &[(i32, i32, i32, i32)],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(IMAGE_HEADER_SIZE + mips.len() * MIP_RECORD_SIZE);
    out.extend_from_slice(IMAGE_MAGIC);
    out.push(11);
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1i32.to_le_bytes());
    out.extend_from_slice(&(mips.len() as i32).to_le_bytes());
    out.extend_from_slice(&0i64.to_le_bytes());
    out.extend_from_slice(&0f32.to_le_bytes());
    out.push(0);
    out.extend_from_slice(&texture_format.to_le_bytes());
    out.extend_from_slice(&7i32.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0i16.to_le_bytes());
    out.push(u8::from(is_streamed));
    out.push(0);
    out.push(0);
    out.push(0);
    out.extend_from_slice(&stream_db_mip_count.to_le_bytes());

    let mut cumulative = 0i32;
    for (level, &(w, h, decompressed, compressed)) in mips.iter().enumerate() {
        out.extend_from_slice(&(level as i64).to_le_bytes());
        out.extend_from_slice(&w.to_le_bytes());
        out.extend_from_slice(&h.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&decompressed.to_le_bytes());
        out.extend_from_slice(&i32::from(decompressed != compressed).to_le_bytes());
        out.extend_from_slice(&compressed.to_le_bytes());
        out.extend_from_slice(&cumulative.to_le_bytes());
        cumulative += decompressed;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{Lz4Block, Unavailable};
    use crate::streamdb::{StreamDb, build_streamdb, stream_key};

    #[test]
    fn test_parse_header() {
        let bytes = build_image_header(64, 32, 21, true, 2, &[(64, 32, 2048, 2048), (32, 16, 512, 512)]);
        let header = ImageHeader::parse(&bytes, "t").unwrap();
        assert_eq!(header.width, 64);
        assert_eq!(header.height, 32);
        assert_eq!(header.mips.len(), 2);
        assert_eq!(header.top_mip().decompressed_size, 2048);
        assert_eq!(header.stream_db_mip_count, 2);
        assert_eq!(header.format().unwrap(), ImageFormat::Bc7);
        assert_eq!(header.data_start, bytes.len());
    }

    #[test]
    fn test_compressed_mip_forces_streamed() {
        let bytes = build_image_header(16, 16, 10, false, 0, &[(16, 16, 128, 90)]);
        let header = ImageHeader::parse(&bytes, "t").unwrap();
        assert!(!header.is_streamed);
        assert!(header.is_streamed());
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            ImageFormat::from_code(77),
            Err(Error::UnsupportedTextureFormat { format: 77 })
        ));
    }

    #[test]
    fn test_inline_pixels_used_directly() {
        let mut bytes = build_image_header(4, 4, 3, false, 0, &[(4, 4, 64, 64)]);
        bytes.extend(std::iter::repeat_n(0xAB, 64));
        let source = ImageSource::InPlace { trailing: &[] };
        let image = reconstruct_image(&bytes, &source, &Unavailable::default(), "t").unwrap();
        assert_eq!(image.pixels.len(), 64);
        assert_eq!(image.format, ImageFormat::Rgba8);
    }

    #[test]
    fn test_in_place_compressed_top_mip() {
        let pixels: Vec<u8> = b"rgba".repeat(64);
        let packed = Lz4Block::compress(&pixels);
        assert!(packed.len() < pixels.len());

        let bytes = build_image_header(8, 8, 3, false, 0, &[(8, 8, 256, packed.len() as i32)]);
        let source = ImageSource::InPlace { trailing: &packed };
        let image = reconstruct_image(&bytes, &source, &Lz4Block, "t").unwrap();
        assert_eq!(image.pixels, pixels);
    }

    #[test]
    fn test_in_place_short_trailing_is_truncation() {
        let bytes = build_image_header(8, 8, 3, false, 0, &[(8, 8, 256, 120)]);
        let trailing = [0u8; 40];
        let source = ImageSource::InPlace { trailing: &trailing };
        let err = reconstruct_image(&bytes, &source, &Lz4Block, "t").unwrap_err();
        assert!(matches!(err, Error::TruncatedData { .. }));
    }

    #[test]
    fn test_streamed_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let pixels = vec![0x5Au8; 256];
        let packed = Lz4Block::compress(&pixels);
        let key = stream_key(0xFEED, 1);
        let path = dir.path().join("a.streamdb");
        std::fs::write(&path, build_streamdb(&[(key, &packed)])).unwrap();
        let shards = ShardSet::new(vec![StreamDb::open(&path).unwrap()]);

        let bytes = build_image_header(16, 16, 21, true, 1, &[(16, 16, 256, packed.len() as i32)]);
        let source = ImageSource::Streamed {
            shards: &shards,
            stream_hash: 0xFEED,
        };
        let image = reconstruct_image(&bytes, &source, &Lz4Block, "t").unwrap();
        assert_eq!(image.pixels, pixels);
    }
}
