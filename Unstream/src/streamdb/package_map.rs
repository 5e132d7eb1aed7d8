//! `packagemapspec.json` - which shards back which container

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageFile {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MapFileRef {
    pub file: usize,
    pub map: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMapEntry {
    pub name: String,
}

/// The game's container-to-shard mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMap {
    #[serde(default)]
    pub files: Vec<PackageFile>,
    #[serde(default, rename = "mapFileRefs")]
    pub map_file_refs: Vec<MapFileRef>,
    #[serde(default)]
    pub maps: Vec<PackageMapEntry>,
}

impl PackageMap {
    /// Load the mapping from disk.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be read or a JSON error if it
    /// is malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse the mapping from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Shard file names (`*.streamdb`) in every map that contains the file
    /// whose name includes `resource_name`, in reference order.
    #[must_use]
    pub fn shard_names_for(&self, resource_name: &str) -> Vec<String> {
        let Some(file_index) = self
            .files
            .iter()
            .position(|f| f.name.contains(resource_name))
        else {
            return Vec::new();
        };

        let maps: Vec<usize> = self
            .map_file_refs
            .iter()
            .filter(|r| r.file == file_index)
            .map(|r| r.map)
            .collect();

        let mut names = Vec::new();
        for reference in self.map_file_refs.iter().filter(|r| maps.contains(&r.map)) {
            if let Some(file) = self.files.get(reference.file)
                && file.name.ends_with(".streamdb")
                && !names.contains(&file.name)
            {
                names.push(file.name.clone());
            }
        }
        names
    }
}
