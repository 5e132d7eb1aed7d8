//! Types shared by the container parsers

use std::path::Path;

use crate::error::{Error, Result};

/// Version assigned to a nested container that declares no usable payload.
pub const PLACEHOLDER_VERSION: u32 = 9999;
/// Type name assigned to empty nested containers.
pub const PLACEHOLDER_TYPE: &str = "Empty File";
/// Version assigned to an entry whose embedded header could not be read.
pub const UNCLASSIFIED_VERSION: u32 = 999;
/// Type name given to plaintext declaration files.
pub const STREAMFILE_TYPE: &str = "rs_streamfile";

/// One logical asset record inside a container.
///
/// Every parser produces the same shape regardless of the on-disk variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Path of the asset inside the archive
    pub name: String,
    /// Declared type tag (e.g. `image`, `compfile`, `rs_streamfile`)
    pub type_name: String,
    /// Semantic type code (see `export::ExportType`)
    pub version: u32,
    /// Offset of the payload from the start of the archive
    pub data_offset: u64,
    /// Stored payload size (possibly compressed)
    pub data_size: u64,
    /// Payload size once decompressed
    pub data_size_uncompressed: u64,
    /// Content identity hash used to locate streamed data
    pub stream_hash: u64,
    /// Codec hint stored with the entry
    pub compression_mode: u8,
    /// The payload is itself a container
    pub nested: bool,
    /// The payload is a nested container declared empty
    pub placeholder: bool,
}

impl Entry {
    /// Whether this entry has no exportable payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_size == 0 || self.placeholder
    }

    /// Whether the stored bytes differ in size from the decompressed payload.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.data_size != self.data_size_uncompressed
    }
}

/// The three on-disk container variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Primary `.resources` container with a full string table
    Resources,
    /// `.pk5` index archive (relative-advance nested sniffing)
    Pk5,
    /// `.wad7` index archive (absolute-seek nested sniffing)
    Wad7,
}

impl ArchiveKind {
    /// Select the variant from the archive's file name.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedArchive`] for any other extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".resources") || name.ends_with(".resources.backup") {
            Ok(Self::Resources)
        } else if name.ends_with(".pk5") {
            Ok(Self::Pk5)
        } else if name.ends_with(".wad7") {
            Ok(Self::Wad7)
        } else {
            Err(Error::UnsupportedArchive {
                path: path.to_path_buf(),
            })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resources => "resources",
            Self::Pk5 => "pk5",
            Self::Wad7 => "wad7",
        }
    }
}

/// Type tag for a flat (non-container) payload in an index archive.
#[must_use]
pub fn plaintext_type(name: &str) -> String {
    if name.contains(".decl") {
        return STREAMFILE_TYPE.to_string();
    }

    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ArchiveKind::from_path("base/gameresources.resources").unwrap(), ArchiveKind::Resources);
        assert_eq!(ArchiveKind::from_path("x/Meta.RESOURCES.backup").unwrap(), ArchiveKind::Resources);
        assert_eq!(ArchiveKind::from_path("base/pak000.pk5").unwrap(), ArchiveKind::Pk5);
        assert_eq!(ArchiveKind::from_path("base/gen.wad7").unwrap(), ArchiveKind::Wad7);
        assert!(ArchiveKind::from_path("base/readme.txt").is_err());
    }

    #[test]
    fn test_plaintext_type() {
        assert_eq!(plaintext_type("generated/decls/weapon/shotgun.decl"), "rs_streamfile");
        assert_eq!(plaintext_type("maps/e1m1.map"), "map");
        assert_eq!(plaintext_type("README"), "file");
    }

    #[test]
    fn test_placeholder_is_empty() {
        let entry = Entry {
            data_size: 128,
            placeholder: true,
            ..Default::default()
        };
        assert!(entry.is_empty());
    }
}
