//! `.pk5` index archive reader
//!
//! Header: `u32 magic`, `u64 index_start` (BE), `u64 index_size` (BE).
//! The index holds a big-endian entry count, then per entry a little-endian
//! name length, the name, and a 24 byte big-endian record.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use super::binary::{map_eof, read_array, read_vec, stream_len};
use super::embedded::{SeekStrategy, classify};
use super::types::Entry;
use crate::error::{Error, Result};

const RECORD_SIZE: usize = 24;

/// Archive header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pk5Header {
    pub magic: u32,
    pub index_start: u64,
    pub index_size: u64,
}

/// Fixed part of an index entry, already byte-swapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pk5Record {
    pub data_start: u64,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub compression_mode: u32,
    pub timestamp: u32,
}

impl Pk5Record {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw: [u8; RECORD_SIZE] = read_array(reader, "pk5 index record")?;
        let mut c = Cursor::new(&raw[..]);
        Ok(Self {
            data_start: c.read_u64::<BigEndian>()?,
            uncompressed_size: c.read_u32::<BigEndian>()?,
            compressed_size: c.read_u32::<BigEndian>()?,
            compression_mode: c.read_u32::<BigEndian>()?,
            timestamp: c.read_u32::<BigEndian>()?,
        })
    }
}

/// Read the index of a `.pk5` archive and classify every entry.
pub fn read_entries<R: Read + Seek>(reader: &mut R) -> Result<Vec<Entry>> {
    let limit = stream_len(reader)?;

    let raw: [u8; 20] = read_array(reader, "pk5 header")?;
    let mut c = Cursor::new(&raw[..]);
    let header = Pk5Header {
        magic: c.read_u32::<LittleEndian>()?,
        index_start: c.read_u64::<BigEndian>()?,
        index_size: c.read_u64::<BigEndian>()?,
    };

    if header.index_start >= limit {
        return Err(Error::truncated(format!("pk5 index at {:#x}", header.index_start)));
    }
    reader.seek(SeekFrom::Start(header.index_start))?;
    let count = reader.read_u32::<BigEndian>().map_err(map_eof("pk5 entry count"))?;

    let mut entries = Vec::with_capacity(count.min(1 << 16) as usize);
    for _ in 0..count {
        let name_len = reader.read_u32::<LittleEndian>().map_err(map_eof("pk5 name length"))?;
        let name = read_vec(reader, u64::from(name_len), limit, "pk5 entry name")?;
        let record = Pk5Record::read(reader)?;

        entries.push(Entry {
            name: String::from_utf8_lossy(&name).into_owned(),
            data_offset: record.data_start,
            data_size: u64::from(record.compressed_size),
            data_size_uncompressed: u64::from(record.uncompressed_size),
            compression_mode: record.compression_mode as u8,
            ..Default::default()
        });
    }

    for entry in &mut entries {
        let classification = classify(reader, entry, SeekStrategy::Relative, limit);
        classification.apply(entry);
    }

    Ok(entries)
}

/// Parse a `.pk5` file into entries.
///
/// # Errors
/// Returns [`Error::ArchiveOpen`] if the file cannot be opened, or a format
/// error if the index is truncated.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::ArchiveOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = read_entries(&mut BufReader::new(file))?;
    tracing::debug!("{}: {} entries", path.display(), entries.len());
    Ok(entries)
}
