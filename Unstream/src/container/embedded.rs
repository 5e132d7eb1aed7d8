//! Nested container detection for index archives
//!
//! Entries of `.pk5` and `.wad7` archives may themselves be small `IDCL`
//! containers. Their first sub-entry decides how the outer entry is
//! classified. Both archive variants must classify identically, but `.pk5`
//! walks the embedded structures by relative advance while `.wad7` seeks to
//! absolute positions.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::binary::{map_eof, offset_add, read_vec, slot_to_string};
use super::resources::{ContainerHeader, ENTRY_SIZE, EntryRecord, HEADER_SIZE, IDCL_MAGIC};
use super::types::{
    Entry, PLACEHOLDER_TYPE, PLACEHOLDER_VERSION, UNCLASSIFIED_VERSION, plaintext_type,
};
use crate::error::{Error, Result};

/// How embedded structures are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeekStrategy {
    /// Advance from the current position
    Relative,
    /// Seek from the start of the embedded container
    Absolute,
}

/// Outcome of sniffing one entry's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classification {
    Flat,
    Nested { version: u32, type_name: String },
    Placeholder,
    Unclassified,
}

impl Classification {
    /// Fill in the classification fields of `entry`.
    pub(crate) fn apply(self, entry: &mut Entry) {
        match self {
            Self::Flat => {
                entry.version = 0;
                entry.type_name = plaintext_type(&entry.name);
            }
            Self::Nested { version, type_name } => {
                entry.version = version;
                entry.type_name = type_name;
                entry.nested = true;
            }
            Self::Placeholder => {
                entry.version = PLACEHOLDER_VERSION;
                entry.type_name = PLACEHOLDER_TYPE.to_string();
                entry.placeholder = true;
            }
            Self::Unclassified => {
                entry.version = UNCLASSIFIED_VERSION;
                entry.type_name = "raw".to_string();
            }
        }
    }
}

/// Classify the payload of `entry`.
///
/// A malformed embedded header degrades this single entry to
/// [`Classification::Unclassified`]; it never fails the archive.
pub(crate) fn classify<R: Read + Seek>(
    reader: &mut R,
    entry: &Entry,
    strategy: SeekStrategy,
    limit: u64,
) -> Classification {
    if entry.data_size < 4 || !starts_with_magic(reader, entry.data_offset) {
        return Classification::Flat;
    }

    let sniffed = match strategy {
        SeekStrategy::Relative => sniff_relative(reader, entry.data_offset, limit),
        SeekStrategy::Absolute => sniff_absolute(reader, entry.data_offset, limit),
    };

    sniffed.unwrap_or_else(|e| {
        tracing::warn!("Unreadable nested container in {}: {e}", entry.name);
        Classification::Unclassified
    })
}

fn starts_with_magic<R: Read + Seek>(reader: &mut R, offset: u64) -> bool {
    reader
        .seek(SeekFrom::Start(offset))
        .and_then(|_| reader.read_u32::<LittleEndian>())
        .is_ok_and(|magic| magic == IDCL_MAGIC)
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidFormat(format!("offset {value:#x} out of range")))
}

fn string_end(header: &ContainerHeader, index: u64, count: u64, next: Option<u64>) -> Result<u64> {
    match next {
        Some(end) if index + 1 < count => Ok(end),
        _ => {
            let blob_start = header.string_blob_start(count)?;
            header
                .addr_dependency_entries
                .checked_sub(blob_start)
                .ok_or_else(|| Error::InvalidFormat("string blob ends before it starts".to_string()))
        }
    }
}

fn sniff_relative<R: Read + Seek>(reader: &mut R, base: u64, limit: u64) -> Result<Classification> {
    reader.seek(SeekFrom::Start(base))?;
    let header = ContainerHeader::read(reader)?;
    if header.num_file_entries == 0 {
        return Ok(Classification::Placeholder);
    }

    reader.seek(SeekFrom::Current(to_i64(header.addr_entries)? - HEADER_SIZE as i64))?;
    let first = EntryRecord::read(reader)?;
    if first.data_size == 0 {
        return Ok(Classification::Placeholder);
    }

    let remaining_records = u64::from(header.num_file_entries - 1) * ENTRY_SIZE;
    reader.seek(SeekFrom::Current(to_i64(remaining_records)?))?;
    let count = reader.read_u64::<LittleEndian>().map_err(map_eof("string count"))?;

    let index = first.path_tuple_index;
    if index >= count || count.saturating_mul(8) > limit {
        return Err(Error::InvalidStringIndex {
            index,
            len: count as usize,
        });
    }

    reader.seek(SeekFrom::Current(to_i64(index * 8)?))?;
    let start = reader.read_u64::<LittleEndian>().map_err(map_eof("string offsets"))?;
    let mut consumed = (index + 1) * 8;
    let next = if index + 1 < count {
        consumed += 8;
        Some(reader.read_u64::<LittleEndian>().map_err(map_eof("string offsets"))?)
    } else {
        None
    };
    let end = string_end(&header, index, count, next)?;
    let len = end
        .checked_sub(start)
        .ok_or_else(|| Error::InvalidFormat(format!("string {index} has negative length")))?;

    let skip = offset_add(count * 8 - consumed, start, "nested type string")?;
    reader.seek(SeekFrom::Current(to_i64(skip)?))?;
    let slot = read_vec(reader, len, limit, "nested type string")?;

    Ok(Classification::Nested {
        version: first.version,
        type_name: slot_to_string(&slot),
    })
}

fn sniff_absolute<R: Read + Seek>(reader: &mut R, base: u64, limit: u64) -> Result<Classification> {
    reader.seek(SeekFrom::Start(base))?;
    let header = ContainerHeader::read(reader)?;
    if header.num_file_entries == 0 {
        return Ok(Classification::Placeholder);
    }

    reader.seek(SeekFrom::Start(offset_add(base, header.addr_entries, "nested entry records")?))?;
    let first = EntryRecord::read(reader)?;
    if first.data_size == 0 {
        return Ok(Classification::Placeholder);
    }

    let table_start = header.string_table_start()?;
    reader.seek(SeekFrom::Start(offset_add(base, table_start, "nested string table")?))?;
    let count = reader.read_u64::<LittleEndian>().map_err(map_eof("string count"))?;
    let index = first.path_tuple_index;
    if index >= count || count.saturating_mul(8) > limit {
        return Err(Error::InvalidStringIndex {
            index,
            len: count as usize,
        });
    }

    let raw = read_vec(reader, count * 8, limit, "string offsets")?;
    let offset_at = |i: u64| -> Option<u64> {
        let i = usize::try_from(i).ok()?;
        let bytes = raw.get(i * 8..i * 8 + 8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    };

    let start = offset_at(index).ok_or_else(|| Error::truncated("string offsets"))?;
    let end = string_end(&header, index, count, offset_at(index + 1))?;
    let len = end
        .checked_sub(start)
        .ok_or_else(|| Error::InvalidFormat(format!("string {index} has negative length")))?;

    let blob_start = offset_add(base, header.string_blob_start(count)?, "nested string blob")?;
    reader.seek(SeekFrom::Start(offset_add(blob_start, start, "nested type string")?))?;
    let slot = read_vec(reader, len, limit, "nested type string")?;

    Ok(Classification::Nested {
        version: first.version,
        type_name: slot_to_string(&slot),
    })
}
