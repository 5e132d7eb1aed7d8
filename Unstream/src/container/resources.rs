//! Primary `.resources` container reader
//!
//! Layout (little-endian): a 0x7C byte header, `num_file_entries` records of
//! 0x90 bytes at `addr_entries`, then the string table (count, offsets,
//! blob) immediately after the records. Entry names and types are resolved
//! through the path-string index list that follows the dependency indexes.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::binary::{offset_add, read_array, read_vec, slot_to_string, stream_len};
use super::types::Entry;
use crate::error::{Error, Result};

/// `IDCL` read as a little-endian u32.
pub const IDCL_MAGIC: u32 = 0x4C434449;
/// Size of the container header.
pub const HEADER_SIZE: u64 = 0x7C;
/// Size of one entry record.
pub const ENTRY_SIZE: u64 = 0x90;

/// Container header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: u32,
    pub version: u32,
    pub flags: u32,
    pub num_segments: u32,
    pub segment_size: u64,
    pub metadata_hash: u64,
    pub num_file_entries: u32,
    pub num_dependency_entries: u32,
    pub num_dependency_indexes: u32,
    pub num_path_string_indexes: u32,
    pub num_special_hashes: u32,
    pub num_meta_entries: u32,
    pub string_table_size: u32,
    pub meta_entries_size: u32,
    pub addr_path_string_offsets: u64,
    pub addr_error_logs: u64,
    pub addr_entries: u64,
    pub addr_dependency_entries: u64,
    pub addr_dependency_indexes: u64,
    pub addr_data: u64,
    pub unknown: u32,
    pub addr_end_marker: u64,
}

impl ContainerHeader {
    /// Read the header field by field. The magic is not checked here.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw: [u8; HEADER_SIZE as usize] = read_array(reader, "container header")?;
        let mut c = Cursor::new(&raw[..]);

        Ok(Self {
            magic: c.read_u32::<LittleEndian>()?,
            version: c.read_u32::<LittleEndian>()?,
            flags: c.read_u32::<LittleEndian>()?,
            num_segments: c.read_u32::<LittleEndian>()?,
            segment_size: c.read_u64::<LittleEndian>()?,
            metadata_hash: c.read_u64::<LittleEndian>()?,
            num_file_entries: c.read_u32::<LittleEndian>()?,
            num_dependency_entries: c.read_u32::<LittleEndian>()?,
            num_dependency_indexes: c.read_u32::<LittleEndian>()?,
            num_path_string_indexes: c.read_u32::<LittleEndian>()?,
            num_special_hashes: c.read_u32::<LittleEndian>()?,
            num_meta_entries: c.read_u32::<LittleEndian>()?,
            string_table_size: c.read_u32::<LittleEndian>()?,
            meta_entries_size: c.read_u32::<LittleEndian>()?,
            addr_path_string_offsets: c.read_u64::<LittleEndian>()?,
            addr_error_logs: c.read_u64::<LittleEndian>()?,
            addr_entries: c.read_u64::<LittleEndian>()?,
            addr_dependency_entries: c.read_u64::<LittleEndian>()?,
            addr_dependency_indexes: c.read_u64::<LittleEndian>()?,
            addr_data: c.read_u64::<LittleEndian>()?,
            unknown: c.read_u32::<LittleEndian>()?,
            addr_end_marker: c.read_u64::<LittleEndian>()?,
        })
    }

    /// Fail unless the magic is `IDCL`.
    pub fn check_magic(&self) -> Result<()> {
        if self.magic == IDCL_MAGIC {
            Ok(())
        } else {
            Err(Error::InvalidContainerMagic { found: self.magic })
        }
    }

    /// Container-relative position of the string table count.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the record table runs past `u64::MAX`.
    pub fn string_table_start(&self) -> Result<u64> {
        offset_add(
            self.addr_entries,
            u64::from(self.num_file_entries) * ENTRY_SIZE,
            "entry records",
        )
    }

    /// Container-relative position of the string blob for a table of `count` strings.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on overflow.
    pub fn string_blob_start(&self, count: u64) -> Result<u64> {
        let offsets = count
            .checked_mul(8)
            .and_then(|n| n.checked_add(8))
            .ok_or_else(|| Error::InvalidFormat(format!("{count} string offsets")))?;
        offset_add(self.string_table_start()?, offsets, "string offsets")
    }

    /// Container-relative position of the path-string index list.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on overflow.
    pub fn path_indexes_start(&self) -> Result<u64> {
        offset_add(
            self.addr_dependency_indexes,
            u64::from(self.num_dependency_indexes) * 4,
            "dependency indexes",
        )
    }
}

/// One 0x90 byte entry record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRecord {
    pub path_tuple_index: u64,
    pub unknown: u64,
    pub description_index: u64,
    pub dependency_index: u64,
    pub strong_hash: u64,
    pub stream_resource_hash: u64,
    pub data_offset: u64,
    pub data_size: u64,
    pub data_size_uncompressed: u64,
    pub data_checksum: u64,
    pub generation_timestamp: u64,
    pub default_hash: u64,
    pub version: u32,
    pub flags: u32,
    pub compression_mode: u8,
    pub variation: u16,
}

impl EntryRecord {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw: [u8; ENTRY_SIZE as usize] = read_array(reader, "entry record")?;
        let mut c = Cursor::new(&raw[..]);

        let path_tuple_index = c.read_u64::<LittleEndian>()?;
        let unknown = c.read_u64::<LittleEndian>()?;
        let description_index = c.read_u64::<LittleEndian>()?;
        let dependency_index = c.read_u64::<LittleEndian>()?;
        let strong_hash = c.read_u64::<LittleEndian>()?;
        let stream_resource_hash = c.read_u64::<LittleEndian>()?;
        let data_offset = c.read_u64::<LittleEndian>()?;
        let data_size = c.read_u64::<LittleEndian>()?;
        let data_size_uncompressed = c.read_u64::<LittleEndian>()?;
        let data_checksum = c.read_u64::<LittleEndian>()?;
        let generation_timestamp = c.read_u64::<LittleEndian>()?;
        let default_hash = c.read_u64::<LittleEndian>()?;
        let version = c.read_u32::<LittleEndian>()?;
        let flags = c.read_u32::<LittleEndian>()?;
        let compression_mode = c.read_u8()?;
        let _reserved = c.read_u8()?;
        let variation = c.read_u16::<LittleEndian>()?;

        Ok(Self {
            path_tuple_index,
            unknown,
            description_index,
            dependency_index,
            strong_hash,
            stream_resource_hash,
            data_offset,
            data_size,
            data_size_uncompressed,
            data_checksum,
            generation_timestamp,
            default_hash,
            version,
            flags,
            compression_mode,
            variation,
        })
    }
}

/// Decoded string table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    /// Read the table positioned at its count field.
    ///
    /// Offsets are relative to the blob start. The last string ends at the
    /// header's `addr_dependency_entries`, not at any stored length.
    pub fn read<R: Read>(reader: &mut R, header: &ContainerHeader, limit: u64) -> Result<Self> {
        let count = reader
            .read_u64::<LittleEndian>()
            .map_err(super::binary::map_eof("string count"))?;
        if count.saturating_mul(8) > limit {
            return Err(Error::truncated("string offsets"));
        }

        let mut offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            offsets.push(
                reader
                    .read_u64::<LittleEndian>()
                    .map_err(super::binary::map_eof("string offsets"))?,
            );
        }

        let blob_start = header.string_blob_start(count)?;
        let blob_len = header
            .addr_dependency_entries
            .checked_sub(blob_start)
            .ok_or_else(|| Error::InvalidFormat("string blob ends before it starts".to_string()))?;
        let blob = read_vec(reader, blob_len, limit, "string blob")?;

        let mut strings = Vec::with_capacity(offsets.len());
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).copied().unwrap_or(blob_len);
            let slot = usize::try_from(start)
                .ok()
                .zip(usize::try_from(end).ok())
                .and_then(|(s, e)| blob.get(s..e))
                .ok_or_else(|| Error::InvalidFormat(format!("string {i} spans {start}..{end} outside blob")))?;
            strings.push(slot_to_string(slot));
        }

        Ok(Self { strings })
    }

    /// Look up a string by index.
    pub fn get(&self, index: u64) -> Result<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(Error::InvalidStringIndex {
                index,
                len: self.strings.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Everything read from one primary container.
#[derive(Debug, Clone, Default)]
pub struct ParsedContainer {
    pub header: ContainerHeader,
    pub records: Vec<EntryRecord>,
    pub strings: StringTable,
    pub path_indexes: Vec<u64>,
}

impl ParsedContainer {
    /// Read a container from the start of `reader`.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let limit = stream_len(reader)?;
        let header = ContainerHeader::read(reader)?;
        header.check_magic()?;

        let table_end = header.string_table_start()?;
        if table_end > limit {
            return Err(Error::truncated(format!(
                "{} entries at {:#x}",
                header.num_file_entries, header.addr_entries
            )));
        }

        reader.seek(SeekFrom::Start(header.addr_entries))?;
        let mut records = Vec::with_capacity(header.num_file_entries as usize);
        for _ in 0..header.num_file_entries {
            records.push(EntryRecord::read(reader)?);
        }

        let strings = StringTable::read(reader, &header, limit)?;

        reader.seek(SeekFrom::Start(header.path_indexes_start()?))?;
        let raw = read_vec(
            reader,
            u64::from(header.num_path_string_indexes) * 8,
            limit,
            "path string indexes",
        )?;
        let mut c = Cursor::new(&raw[..]);
        let mut path_indexes = Vec::with_capacity(header.num_path_string_indexes as usize);
        for _ in 0..header.num_path_string_indexes {
            path_indexes.push(c.read_u64::<LittleEndian>()?);
        }

        Ok(Self {
            header,
            records,
            strings,
            path_indexes,
        })
    }

    /// Resolve `strings[path_indexes[index]]`.
    fn path_string(&self, index: u64) -> Result<&str> {
        let string_index = usize::try_from(index)
            .ok()
            .and_then(|i| self.path_indexes.get(i))
            .ok_or(Error::InvalidStringIndex {
                index,
                len: self.path_indexes.len(),
            })?;
        self.strings.get(*string_index)
    }

    /// Convert the records into uniform entries.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        self.records
            .iter()
            .map(|record| {
                let name_index = record.path_tuple_index.checked_add(1).ok_or(Error::InvalidStringIndex {
                    index: record.path_tuple_index,
                    len: self.path_indexes.len(),
                })?;
                Ok(Entry {
                    name: self.path_string(name_index)?.to_string(),
                    type_name: self.path_string(record.path_tuple_index)?.to_string(),
                    version: record.version,
                    data_offset: record.data_offset,
                    data_size: record.data_size,
                    data_size_uncompressed: record.data_size_uncompressed,
                    stream_hash: record.stream_resource_hash,
                    compression_mode: record.compression_mode,
                    nested: false,
                    placeholder: false,
                })
            })
            .collect()
    }
}

/// Parse a `.resources` file into entries.
///
/// # Errors
/// Returns [`Error::ArchiveOpen`] if the file cannot be opened, or a format
/// error if the header, record table or string table is inconsistent.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::ArchiveOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let container = ParsedContainer::read(&mut reader)?;
    tracing::debug!(
        "{}: {} entries, {} strings",
        path.display(),
        container.records.len(),
        container.strings.len()
    );
    container.entries()
}

/// Parse a container held in memory.
pub fn parse_bytes(data: &[u8]) -> Result<Vec<Entry>> {
    ParsedContainer::read(&mut Cursor::new(data))?.entries()
}
