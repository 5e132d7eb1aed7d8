//! Container parsers
//!
//! Three on-disk variants share one entry model:
//!
//! - `.resources` - primary container with a full string table
//! - `.pk5` / `.wad7` - index archives whose entries may be flat files or
//!   small embedded containers

mod binary;
mod embedded;
pub mod pk5;
pub mod resources;
pub mod types;
pub mod wad7;

pub use resources::{ContainerHeader, EntryRecord, IDCL_MAGIC, ParsedContainer};
pub use types::{ArchiveKind, Entry, PLACEHOLDER_TYPE, PLACEHOLDER_VERSION, plaintext_type};

use std::path::{Path, PathBuf};

use crate::error::Result;

/// An opened archive: its path, variant and parsed entries.
#[derive(Debug, Clone)]
pub struct Archive {
    pub path: PathBuf,
    pub kind: ArchiveKind,
    pub entries: Vec<Entry>,
}

impl Archive {
    /// Open and parse an archive, choosing the parser from its extension.
    ///
    /// # Errors
    /// Returns an open error for unreadable or unsupported files and a
    /// format error for inconsistent headers or tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let kind = ArchiveKind::from_path(path)?;
        let entries = match kind {
            ArchiveKind::Resources => resources::parse(path)?,
            ArchiveKind::Pk5 => pk5::parse(path)?,
            ArchiveKind::Wad7 => wad7::parse(path)?,
        };

        tracing::info!(
            "Opened {} archive {} ({} entries)",
            kind.as_str(),
            path.display(),
            entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            entries,
        })
    }

    /// Build an archive from entries that were already parsed.
    #[must_use]
    pub fn from_entries(path: PathBuf, kind: ArchiveKind, entries: Vec<Entry>) -> Self {
        Self {
            path,
            kind,
            entries,
        }
    }

    /// Find an entry by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Parse any supported archive into entries.
///
/// # Errors
/// See [`Archive::open`].
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>> {
    Archive::open(path).map(|archive| archive.entries)
}
