//! Output sinks for texture and model payloads
//!
//! Image decoding and mesh conversion are outside this crate. Front ends
//! plug their own codecs in here; the defaults write what the archive holds.

use std::fs;
use std::path::Path;

use super::dds::assemble_dds;
use super::image::ReconstructedImage;
use crate::container::Entry;
use crate::error::Result;

/// Receives reconstructed images.
pub trait TextureSink: Send + Sync {
    /// Extension appended to image output paths (without the dot).
    fn extension(&self) -> &str;

    /// Write `image` to `path`.
    fn write(&self, image: ReconstructedImage, path: &Path) -> Result<()>;
}

/// Receives model payloads (types 31 and 67).
pub trait ModelSink: Send + Sync {
    /// Write the model bytes of `entry` to `path`.
    fn write(&self, entry: &Entry, data: &[u8], path: &Path) -> Result<()>;
}

/// Writes images as DDS containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdsTextureSink;

impl TextureSink for DdsTextureSink {
    fn extension(&self) -> &str {
        "dds"
    }

    fn write(&self, image: ReconstructedImage, path: &Path) -> Result<()> {
        let width = image.header.width.max(1) as u32;
        let height = image.header.height.max(1) as u32;
        let dds = assemble_dds(width, height, image.format, image.pixels)?;
        create_parent(path)?;
        fs::write(path, dds)?;
        Ok(())
    }
}

/// Writes model payloads unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawModelSink;

impl ModelSink for RawModelSink {
    fn write(&self, _entry: &Entry, data: &[u8], path: &Path) -> Result<()> {
        create_parent(path)?;
        fs::write(path, data)?;
        Ok(())
    }
}

pub(crate) fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
