//! `.wad7` index archive reader
//!
//! Same index shape as `.pk5` with a longer header (version, checksum,
//! padding) and a 32 byte record whose trailing fields stay as read.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use super::binary::{map_eof, read_array, read_vec, stream_len};
use super::embedded::{SeekStrategy, classify};
use super::types::Entry;
use crate::error::{Error, Result};

const HEADER_SIZE: usize = 35;
const RECORD_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wad7Header {
    pub magic: u32,
    pub version: u16,
    pub checksum: u64,
    pub index_start: u64,
    pub index_size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wad7Record {
    pub data_start: u64,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub compression_mode: u32,
    pub unknown0: u32,
    pub unknown1: u64,
}

impl Wad7Header {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw: [u8; HEADER_SIZE] = read_array(reader, "wad7 header")?;
        let mut c = Cursor::new(&raw[..]);
        let magic = c.read_u32::<LittleEndian>()?;
        let version = c.read_u16::<LittleEndian>()?;
        let checksum = c.read_u64::<LittleEndian>()?;
        c.set_position(c.position() + 5);
        Ok(Self {
            magic,
            version,
            checksum,
            index_start: c.read_u64::<BigEndian>()?,
            index_size: c.read_u64::<BigEndian>()?,
        })
    }
}

impl Wad7Record {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw: [u8; RECORD_SIZE] = read_array(reader, "wad7 index record")?;
        let mut c = Cursor::new(&raw[..]);
        Ok(Self {
            data_start: c.read_u64::<BigEndian>()?,
            uncompressed_size: c.read_u32::<BigEndian>()?,
            compressed_size: c.read_u32::<BigEndian>()?,
            compression_mode: c.read_u32::<BigEndian>()?,
            unknown0: c.read_u32::<LittleEndian>()?,
            unknown1: c.read_u64::<LittleEndian>()?,
        })
    }
}

/// Read the index of a `.wad7` archive and classify every entry.
pub fn read_entries<R: Read + Seek>(reader: &mut R) -> Result<Vec<Entry>> {
    let limit = stream_len(reader)?;
    let header = Wad7Header::read(reader)?;
    tracing::trace!("wad7 version {} checksum {:#x}", header.version, header.checksum);

    if header.index_start >= limit {
        return Err(Error::truncated(format!("wad7 index at {:#x}", header.index_start)));
    }
    reader.seek(SeekFrom::Start(header.index_start))?;
    let count = reader.read_u32::<BigEndian>().map_err(map_eof("wad7 entry count"))?;

    let mut entries = Vec::with_capacity(count.min(1 << 16) as usize);
    for _ in 0..count {
        let name_len = reader.read_u32::<LittleEndian>().map_err(map_eof("wad7 name length"))?;
        let name = read_vec(reader, u64::from(name_len), limit, "wad7 entry name")?;
        let record = Wad7Record::read(reader)?;

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
        classify(reader, entry, SeekStrategy::Absolute, limit).apply(entry);
    }

    Ok(entries)
}

/// Parse a `.wad7` file into entries.
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
