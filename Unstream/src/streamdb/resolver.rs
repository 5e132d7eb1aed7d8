//! Streamed payload resolution across an ordered shard list

use std::path::{Path, PathBuf};

use super::key::{retry_key, stream_key};
use super::package_map::PackageMap;
use super::shard::{ShardEntry, StreamDb};
use crate::compression::{Decompressor, decompress_if_needed};
use crate::error::{Error, Result};

/// Where a payload was found.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub shard: &'a StreamDb,
    pub entry: ShardEntry,
    /// The key that matched (the derived key or its retry)
    pub key: u64,
}

/// Shards in search priority order (patch shards first).
///
/// Read-only after loading and shared by every work unit of an export.
#[derive(Debug, Clone, Default)]
pub struct ShardSet {
    shards: Vec<StreamDb>,
}

impl ShardSet {
    #[must_use]
    pub fn new(shards: Vec<StreamDb>) -> Self {
        Self { shards }
    }

    /// Load shards from `paths`, keeping their order. Missing or malformed
    /// shards are skipped with a warning so one bad file does not block
    /// exporting everything else.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let shards = paths
            .iter()
            .filter_map(|path| match StreamDb::open(path) {
                Ok(shard) => Some(shard),
                Err(e) => {
                    tracing::warn!("Skipping streamdb {}: {e}", path.as_ref().display());
                    None
                }
            })
            .collect();
        Self { shards }
    }

    /// Discover and load the shards that back `archive`.
    ///
    /// Uses `packagemapspec.json` under the game's `base` directory when
    /// present; `priority` shard names are searched before everything else.
    pub fn discover(archive: &Path, base_dir: Option<&Path>, priority: &[String]) -> Self {
        let Some(base) = base_dir.map(Path::to_path_buf).or_else(|| find_base_dir(archive)) else {
            tracing::debug!("No base directory for {}", archive.display());
            return Self::default();
        };

        let map = match PackageMap::load(base.join("packagemapspec.json")) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("No package map under {}: {e}", base.display());
                return Self::default();
            }
        };

        let archive_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let paths = shard_paths(&base, &map, &archive_name, priority);
        Self::load(&paths)
    }

    #[must_use]
    pub fn shards(&self) -> &[StreamDb] {
        &self.shards
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    fn find(&self, key: u64) -> Option<(&StreamDb, ShardEntry)> {
        self.shards
            .iter()
            .find_map(|shard| shard.lookup(key).map(|entry| (shard, *entry)))
    }

    /// Locate the payload for `identity`.
    ///
    /// Searches every shard for the derived key; on a miss, searches once
    /// more for the key minus one. No other keys are tried.
    ///
    /// # Errors
    /// Returns [`Error::StreamResolutionMiss`] when neither key matches.
    pub fn locate(&self, name: &str, identity: u64, variant_count: i32) -> Result<Located<'_>> {
        let key = stream_key(identity, variant_count);

        for candidate in [key, retry_key(key)] {
            if let Some((shard, entry)) = self.find(candidate) {
                if candidate != key {
                    tracing::debug!("{name}: matched retry key {candidate:#x}");
                }
                return Ok(Located {
                    shard,
                    entry,
                    key: candidate,
                });
            }
        }

        Err(Error::StreamResolutionMiss {
            name: name.to_string(),
            key,
        })
    }

    /// Locate, read and (when needed) decompress a streamed payload to
    /// `expected` bytes.
    pub fn resolve(
        &self,
        codec: &dyn Decompressor,
        name: &str,
        identity: u64,
        variant_count: i32,
        expected: usize,
    ) -> Result<Vec<u8>> {
        let located = self.locate(name, identity, variant_count)?;
        let stored = located.shard.read_payload(&located.entry)?;
        decompress_if_needed(codec, stored, expected, name)
    }
}

/// Nearest ancestor directory named `base`.
#[must_use]
pub fn find_base_dir(archive: &Path) -> Option<PathBuf> {
    archive
        .ancestors()
        .skip(1)
        .find(|dir| dir.file_name().is_some_and(|n| n.eq_ignore_ascii_case("base")))
        .map(Path::to_path_buf)
}

/// Shard holding custom model mod payloads, searched first when present.
pub const MOD_SHARD: &str = "EternalMod.streamdb";

/// Ordered shard paths for `archive_name`.
///
/// Shared game shards come first, then the archive's own; names repeat only
/// once. Priority shards that exist on disk are placed ahead of everything,
/// behind [`MOD_SHARD`] if the game directory has one.
#[must_use]
pub fn shard_paths(base: &Path, map: &PackageMap, archive_name: &str, priority: &[String]) -> Vec<PathBuf> {
    let mut names: Vec<String> = Vec::new();
    for resource in ["gameresources.resources", "warehouse.resources", archive_name] {
        for name in map.shard_names_for(resource) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    let on_disk = std::iter::once(MOD_SHARD)
        .chain(priority.iter().map(String::as_str))
        .map(|name| base.join(name))
        .filter(|path| path.is_file());
    for path in on_disk.chain(names.iter().map(|name| base.join(name))) {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Lz4Block;
    use crate::streamdb::shard::build_streamdb;

    fn shard_with(dir: &Path, name: &str, payloads: &[(u64, &[u8])]) -> StreamDb {
        let path = dir.join(name);
        std::fs::write(&path, build_streamdb(payloads)).unwrap();
        StreamDb::open(path).unwrap()
    }

    #[test]
    fn test_direct_hit() {
        let dir = tempfile::tempdir().unwrap();
        let key = stream_key(0x1111, 0);
        let set = ShardSet::new(vec![shard_with(dir.path(), "a.streamdb", &[(key, b"pixels")])]);

        let found = set.locate("t", 0x1111, 0).unwrap();
        assert_eq!(found.key, key);
        assert_eq!(set.resolve(&Lz4Block, "t", 0x1111, 0, 6).unwrap(), b"pixels");
    }

    #[test]
    fn test_retry_hit() {
        let dir = tempfile::tempdir().unwrap();
        let key = stream_key(0x2222, 1);
        let set = ShardSet::new(vec![shard_with(dir.path(), "a.streamdb", &[(key - 1, b"shifted")])]);

        let found = set.locate("t", 0x2222, 1).unwrap();
        assert_eq!(found.key, key - 1);
    }

    #[test]
    fn test_miss_after_retry() {
        let dir = tempfile::tempdir().unwrap();
        let key = stream_key(0x3333, 0);
        // Neither key nor key-1; key-2 must never be tried.
        let set = ShardSet::new(vec![shard_with(
            dir.path(),
            "a.streamdb",
            &[(key - 2, b"x"), (key + 1, b"y")],
        )]);

        match set.locate("tex.tga", 0x3333, 0) {
            Err(Error::StreamResolutionMiss { name, key: k }) => {
                assert_eq!(name, "tex.tga");
                assert_eq!(k, key);
            }
            other => panic!("expected miss, got {other:?}"),
        }
    }

    #[test]
    fn test_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let key = stream_key(0x4444, 0);
        let patch = shard_with(dir.path(), "patch.streamdb", &[(key, b"new")]);
        let base = shard_with(dir.path(), "base.streamdb", &[(key, b"old")]);
        let set = ShardSet::new(vec![patch, base]);

        assert_eq!(set.resolve(&Lz4Block, "t", 0x4444, 0, 3).unwrap(), b"new");
    }

    #[test]
    fn test_compressed_payload_is_bridged() {
        let dir = tempfile::tempdir().unwrap();
        let original = b"mip zero ".repeat(50);
        let packed = Lz4Block::compress(&original);
        let key = stream_key(0x5555, 2);
        let set = ShardSet::new(vec![shard_with(dir.path(), "a.streamdb", &[(key, &packed)])]);

        let out = set.resolve(&Lz4Block, "t", 0x5555, 2, original.len()).unwrap();
        assert_eq!(out, original);
    }

    fn names_of(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    const MAP: &str = r#"{
        "files": [
            {"name": "e1m1_intro.resources"},
            {"name": "e1m1_intro.streamdb"}
        ],
        "mapFileRefs": [{"file": 0, "map": 0}, {"file": 1, "map": 0}],
        "maps": [{"name": "e1m1_intro"}]
    }"#;

    #[test]
    fn test_mod_shard_searched_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MOD_SHARD), build_streamdb(&[])).unwrap();
        std::fs::write(dir.path().join("patch.streamdb"), build_streamdb(&[])).unwrap();
        let map = PackageMap::from_json(MAP).unwrap();

        let priority = ["patch.streamdb".to_string(), MOD_SHARD.to_string()];
        let paths = shard_paths(dir.path(), &map, "e1m1_intro.resources", &priority);
        assert_eq!(
            names_of(&paths),
            vec![MOD_SHARD, "patch.streamdb", "e1m1_intro.streamdb"]
        );
    }

    #[test]
    fn test_mod_shard_skipped_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let map = PackageMap::from_json(MAP).unwrap();

        let paths = shard_paths(dir.path(), &map, "e1m1_intro.resources", &[]);
        assert_eq!(names_of(&paths), vec!["e1m1_intro.streamdb"]);
    }

    #[test]
    fn test_find_base_dir() {
        let path = Path::new("/games/doom/base/game/e1m1.resources");
        assert_eq!(find_base_dir(path), Some(PathBuf::from("/games/doom/base")));
        assert_eq!(find_base_dir(Path::new("/tmp/x.resources")), None);
    }
}
