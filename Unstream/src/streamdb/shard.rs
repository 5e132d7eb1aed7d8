//! StreamDB shard files
//!
//! Layout (little-endian): `u64 magic`, `u32 header_size`, 12 padding bytes,
//! `u32 num_entries`, `u32 flags`, then at `header_size` a table of
//! `{u64 identity, u32 offset16, u32 compressed_size}` records. Payload
//! offsets are stored in 16 byte units.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// Magic at the start of every shard.
pub const STREAMDB_MAGIC: u64 = 0x61C7F32E29C2A550;
const HEADER_SIZE: usize = 32;
const RECORD_SIZE: u64 = 16;

/// One payload location inside a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardEntry {
    /// Lookup key the payload is stored under
    pub identity: u64,
    /// Byte offset of the payload
    pub offset: u64,
    /// Stored (possibly compressed) payload size
    pub compressed_size: u32,
}

/// A loaded streamed-data database file.
#[derive(Debug, Clone)]
pub struct StreamDb {
    path: PathBuf,
    entries: Vec<ShardEntry>,
    by_identity: HashMap<u64, usize>,
}

impl StreamDb {
    /// Load a shard's index.
    ///
    /// # Errors
    /// Returns [`Error::ArchiveOpen`] if the file cannot be opened and
    /// [`Error::InvalidStreamDbMagic`] or [`Error::TruncatedData`] if the
    /// header or table is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::ArchiveOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = Self::read_index(&mut BufReader::new(file), path)?;
        tracing::debug!("Loaded streamdb {} ({} entries)", path.display(), entries.len());
        Ok(Self::from_entries(path.to_path_buf(), entries))
    }

    fn read_index<R: Read + Seek>(reader: &mut R, path: &Path) -> Result<Vec<ShardEntry>> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut raw = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut raw)
            .map_err(|_| Error::truncated(format!("streamdb header of {}", path.display())))?;
        let mut c = Cursor::new(&raw[..]);

        let magic = c.read_u64::<LittleEndian>()?;
        if magic != STREAMDB_MAGIC {
            return Err(Error::InvalidStreamDbMagic {
                path: path.to_path_buf(),
                found: magic,
            });
        }
        let header_size = c.read_u32::<LittleEndian>()?;
        c.set_position(c.position() + 12);
        let num_entries = c.read_u32::<LittleEndian>()?;
        let _flags = c.read_u32::<LittleEndian>()?;

        let table_len = u64::from(num_entries) * RECORD_SIZE;
        if u64::from(header_size) + table_len > len {
            return Err(Error::truncated(format!(
                "{num_entries} streamdb entries in {}",
                path.display()
            )));
        }

        reader.seek(SeekFrom::Start(u64::from(header_size)))?;
        let mut table = vec![0u8; table_len as usize];
        reader.read_exact(&mut table)?;
        let mut c = Cursor::new(&table[..]);

        let mut entries = Vec::with_capacity(num_entries as usize);
        for _ in 0..num_entries {
            let identity = c.read_u64::<LittleEndian>()?;
            let offset16 = c.read_u32::<LittleEndian>()?;
            let compressed_size = c.read_u32::<LittleEndian>()?;
            entries.push(ShardEntry {
                identity,
                offset: u64::from(offset16) * 16,
                compressed_size,
            });
        }
        Ok(entries)
    }

    /// Build a shard from an already known table.
    #[must_use]
    pub fn from_entries(path: PathBuf, entries: Vec<ShardEntry>) -> Self {
        let mut by_identity = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            // First record wins for duplicated identities.
            by_identity.entry(entry.identity).or_insert(i);
        }
        Self {
            path,
            entries,
            by_identity,
        }
    }

    /// Find the record stored under `identity`.
    #[must_use]
    pub fn lookup(&self, identity: u64) -> Option<&ShardEntry> {
        self.by_identity.get(&identity).map(|&i| &self.entries[i])
    }

    /// Read the stored bytes of `entry` with a handle scoped to this call.
    ///
    /// # Errors
    /// Returns an error if the shard cannot be opened or is shorter than the
    /// record claims.
    pub fn read_payload(&self, entry: &ShardEntry) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path).map_err(|source| Error::ArchiveOpen {
            path: self.path.clone(),
            source,
        })?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let mut data = vec![0u8; entry.compressed_size as usize];
        file.read_exact(&mut data).map_err(|_| {
            Error::truncated(format!(
                "payload {:#x} in {}",
                entry.identity,
                self.path.display()
            ))
        })?;
        Ok(data)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[ShardEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize a shard file. Payloads are placed after the table, each on a
/// 16 byte boundary; the table is filled from the resulting offsets.
///
/// Used to build fixtures and repacked mod shards.
#[must_use]
pub fn build_streamdb(payloads: &[(u64, &[u8])]) -> Vec<u8> {
    let table_end = HEADER_SIZE as u64 + payloads.len() as u64 * RECORD_SIZE;
    let mut data_start = table_end.next_multiple_of(16);

    let mut out = Vec::new();
    out.extend_from_slice(&STREAMDB_MAGIC.to_le_bytes());
    out.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(&(payloads.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    let mut body = Vec::new();
    for (identity, payload) in payloads {
        out.extend_from_slice(&identity.to_le_bytes());
        out.extend_from_slice(&((data_start / 16) as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());

        body.extend_from_slice(payload);
        body.resize(body.len().next_multiple_of(16), 0);
        data_start = table_end.next_multiple_of(16) + body.len() as u64;
    }

    out.resize(out.len().next_multiple_of(16), 0);
    out.extend_from_slice(&body);
    out
}
