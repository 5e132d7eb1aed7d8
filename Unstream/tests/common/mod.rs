//! Builders for synthetic archives and shards.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use unstream::container::IDCL_MAGIC;

const HEADER_SIZE: u64 = 0x7C;
const ENTRY_SIZE: u64 = 0x90;

/// One entry of a synthetic `.resources` container.
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    pub name: String,
    pub type_name: String,
    pub version: u32,
    pub data: Vec<u8>,
    pub uncompressed_size: u64,
    pub stream_hash: u64,
}

impl ContainerEntry {
    /// An entry stored uncompressed.
    pub fn stored(name: &str, type_name: &str, version: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            version,
            uncompressed_size: data.len() as u64,
            data,
            stream_hash: 0,
        }
    }

    /// An entry whose payload is LZ4 packed.
    pub fn packed(name: &str, type_name: &str, version: u32, data: &[u8]) -> Self {
        Self {
            uncompressed_size: data.len() as u64,
            ..Self::stored(name, type_name, version, lz4_flex::block::compress(data))
        }
    }

    /// An entry with no payload.
    pub fn empty(name: &str, type_name: &str, version: u32) -> Self {
        Self::stored(name, type_name, version, Vec::new())
    }

    #[must_use]
    pub fn with_stream_hash(mut self, hash: u64) -> Self {
        self.stream_hash = hash;
        self
    }
}

/// Serialize a `.resources` container.
///
/// Strings are laid out as `type, name` per entry with an identity path
/// index list, so entry `i` has path tuple index `2 * i`. Payloads follow
/// the path indexes; data offsets are relative to the container start.
pub fn build_container(entries: &[ContainerEntry]) -> Vec<u8> {
    let count = entries.len() as u64;
    let strings: Vec<Vec<u8>> = entries
        .iter()
        .flat_map(|e| [e.type_name.as_str(), e.name.as_str()])
        .map(|s| {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            bytes
        })
        .collect();
    let string_count = strings.len() as u64;

    let addr_entries = HEADER_SIZE;
    let table_start = addr_entries + count * ENTRY_SIZE;
    let blob_start = table_start + 8 + string_count * 8;
    let blob_len: u64 = strings.iter().map(|s| s.len() as u64).sum();
    let addr_dependency_entries = blob_start + blob_len;
    let addr_dependency_indexes = addr_dependency_entries;
    let addr_data = addr_dependency_indexes + string_count * 8;

    let mut out = Vec::new();
    out.extend_from_slice(&IDCL_MAGIC.to_le_bytes());
    out.extend_from_slice(&12u32.to_le_bytes()); // version
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out.extend_from_slice(&1u32.to_le_bytes()); // segments
    out.extend_from_slice(&0u64.to_le_bytes()); // segment size
    out.extend_from_slice(&0u64.to_le_bytes()); // metadata hash
    out.extend_from_slice(&(count as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // dependency entries
    out.extend_from_slice(&0u32.to_le_bytes()); // dependency indexes
    out.extend_from_slice(&(string_count as u32).to_le_bytes()); // path string indexes
    out.extend_from_slice(&0u32.to_le_bytes()); // special hashes
    out.extend_from_slice(&0u32.to_le_bytes()); // meta entries
    out.extend_from_slice(&(8 + string_count * 8 + blob_len).to_le_bytes()[..4]);
    out.extend_from_slice(&0u32.to_le_bytes()); // meta entries size
    out.extend_from_slice(&table_start.to_le_bytes()); // path string offsets
    out.extend_from_slice(&0u64.to_le_bytes()); // error logs
    out.extend_from_slice(&addr_entries.to_le_bytes());
    out.extend_from_slice(&addr_dependency_entries.to_le_bytes());
    out.extend_from_slice(&addr_dependency_indexes.to_le_bytes());
    out.extend_from_slice(&addr_data.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // end marker
    assert_eq!(out.len() as u64, HEADER_SIZE);

    let mut data_offset = addr_data;
    for (i, entry) in entries.iter().enumerate() {
        let mut record = vec![0u8; ENTRY_SIZE as usize];
        record[0x00..0x08].copy_from_slice(&(2 * i as u64).to_le_bytes());
        record[0x28..0x30].copy_from_slice(&entry.stream_hash.to_le_bytes());
        let offset = if entry.data.is_empty() { 0 } else { data_offset };
        record[0x30..0x38].copy_from_slice(&offset.to_le_bytes());
        record[0x38..0x40].copy_from_slice(&(entry.data.len() as u64).to_le_bytes());
        record[0x40..0x48].copy_from_slice(&entry.uncompressed_size.to_le_bytes());
        record[0x60..0x64].copy_from_slice(&entry.version.to_le_bytes());
        out.extend_from_slice(&record);
        data_offset += entry.data.len() as u64;
    }

    out.extend_from_slice(&string_count.to_le_bytes());
    let mut offset = 0u64;
    for s in &strings {
        out.extend_from_slice(&offset.to_le_bytes());
        offset += s.len() as u64;
    }
    for s in &strings {
        out.extend_from_slice(s);
    }

    for index in 0..string_count {
        out.extend_from_slice(&index.to_le_bytes());
    }
    assert_eq!(out.len() as u64, addr_data);

    for entry in entries {
        out.extend_from_slice(&entry.data);
    }
    out
}

/// One file of a synthetic index archive.
pub struct IndexFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl IndexFile {
    pub fn new(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }
}

/// Payloads placed after a header of `header_len` bytes, then the index.
fn index_archive(
    header_len: usize,
    files: &[IndexFile],
    record: impl Fn(u64, &IndexFile) -> Vec<u8>,
) -> (Vec<u8>, u64, u64) {
    let mut body = vec![0u8; header_len];
    let mut offsets = Vec::with_capacity(files.len());
    for file in files {
        offsets.push(body.len() as u64);
        body.extend_from_slice(&file.data);
    }

    let index_start = body.len() as u64;
    body.extend_from_slice(&(files.len() as u32).to_be_bytes());
    for (file, offset) in files.iter().zip(offsets) {
        body.extend_from_slice(&(file.name.len() as u32).to_le_bytes());
        body.extend_from_slice(file.name.as_bytes());
        body.extend_from_slice(&record(offset, file));
    }
    let index_size = body.len() as u64 - index_start;
    (body, index_start, index_size)
}

/// Serialize a `.pk5` archive.
pub fn build_pk5(files: &[IndexFile]) -> Vec<u8> {
    let (mut out, index_start, index_size) = index_archive(20, files, |offset, file| {
        let mut record = Vec::with_capacity(24);
        record.extend_from_slice(&offset.to_be_bytes());
        record.extend_from_slice(&(file.data.len() as u32).to_be_bytes());
        record.extend_from_slice(&(file.data.len() as u32).to_be_bytes());
        record.extend_from_slice(&0u32.to_be_bytes());
        record.extend_from_slice(&0u32.to_be_bytes());
        record
    });
    out[0..4].copy_from_slice(b"PK5\0");
    out[4..12].copy_from_slice(&index_start.to_be_bytes());
    out[12..20].copy_from_slice(&index_size.to_be_bytes());
    out
}

/// Serialize a `.wad7` archive.
pub fn build_wad7(files: &[IndexFile]) -> Vec<u8> {
    let (mut out, index_start, index_size) = index_archive(35, files, |offset, file| {
        let mut record = Vec::with_capacity(32);
        record.extend_from_slice(&offset.to_be_bytes());
        record.extend_from_slice(&(file.data.len() as u32).to_be_bytes());
        record.extend_from_slice(&(file.data.len() as u32).to_be_bytes());
        record.extend_from_slice(&0u32.to_be_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&0u64.to_le_bytes());
        record
    });
    out[0..4].copy_from_slice(b"WAD7");
    out[4..6].copy_from_slice(&7u16.to_le_bytes());
    out[6..14].copy_from_slice(&0xC0FF_EEu64.to_le_bytes());
    out[19..27].copy_from_slice(&index_start.to_be_bytes());
    out[27..35].copy_from_slice(&index_size.to_be_bytes());
    out
}

/// Write `data` to `dir/name`, creating parents.
pub fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, data).unwrap();
    path
}

/// 4x4 RGBA8 pixels with a recognizable pattern.
pub fn rgba_pixels() -> Vec<u8> {
    (0u8..64).collect()
}

/// Image payload header for a single 4x4 RGBA8 mip with no inline pixels.
pub fn streamed_image_header() -> Vec<u8> {
    unstream::reconstruct::image::build_image_header(4, 4, 3, true, 1, &[(4, 4, 64, 64)])
}

/// Size of an assembled DX10 DDS holding `payload` bytes.
pub fn dds_len(payload: usize) -> u64 {
    (4 + 124 + 20 + payload) as u64
}
