//! Payload reconstruction
//!
//! Turns an entry's stored bytes into the file written to disk. Pixel and
//! geometry decoding are left to [`TextureSink`] and [`ModelSink`]
//! implementations; the defaults write the assembled DDS and the raw model
//! bytes.

pub mod comp;
pub mod dds;
pub mod image;
pub mod sinks;

pub use comp::decode_compressed_blob;
pub use dds::assemble_dds;
pub use image::{ImageFormat, ImageHeader, ImageSource, MipInfo, ReconstructedImage, reconstruct_image};
pub use sinks::{DdsTextureSink, ModelSink, RawModelSink, TextureSink};

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::compression::{Decompressor, decompress_if_needed};
use crate::container::Entry;
use crate::error::{Error, Result};

/// Read an entry's payload from `archive`, decompressing it when the stored
/// size differs from the declared uncompressed size.
///
/// # Errors
/// Returns an open error if the archive cannot be read, a truncation error
/// if the payload runs past the end of the file, or a codec error.
pub fn read_entry_bytes(archive: &Path, entry: &Entry, codec: &dyn Decompressor) -> Result<Vec<u8>> {
    let stored = read_stored_bytes(archive, entry)?;
    decompress_if_needed(
        codec,
        stored,
        entry.data_size_uncompressed as usize,
        &entry.name,
    )
}

/// Read an entry's stored bytes without decompressing them.
pub fn read_stored_bytes(archive: &Path, entry: &Entry) -> Result<Vec<u8>> {
    read_range(archive, entry.data_offset, entry.data_size, &entry.name)
}

/// Read `len` bytes at `offset` with a handle scoped to this call.
pub(crate) fn read_range(archive: &Path, offset: u64, len: u64, name: &str) -> Result<Vec<u8>> {
    let mut file = File::open(archive).map_err(|source| Error::ArchiveOpen {
        path: archive.to_path_buf(),
        source,
    })?;
    let file_len = file.metadata()?.len();
    if offset.saturating_add(len) > file_len {
        return Err(Error::truncated(format!(
            "{name}: {len} bytes at {offset:#x} past end of {}",
            archive.display()
        )));
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut data = vec![0u8; len as usize];
    file.read_exact(&mut data)?;
    Ok(data)
}
