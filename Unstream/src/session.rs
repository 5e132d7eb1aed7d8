//! Archive session
//!
//! A [`ResourceSession`] owns one opened archive and the shards its streamed
//! payloads resolve against. Everything parsed at open time lives exactly as
//! long as the session.

use std::path::Path;

use crate::compression::Decompressor;
use crate::container::{Archive, Entry};
use crate::error::Result;
use crate::export::{
    ExportManager, ExportOptions, ExportReport, ProgressCallback, Selection, select_all,
    select_names,
};
use crate::streamdb::ShardSet;

/// An opened archive plus its shard set.
///
/// # Example
///
/// ```no_run
/// use unstream::compression::Lz4Block;
/// use unstream::export::ExportOptions;
/// use unstream::session::ResourceSession;
///
/// let session = ResourceSession::open("base/e1m1_intro.resources", &["base/gameresources.streamdb"])?;
/// let report = session.export_all("out", &Lz4Block, ExportOptions::default(), &|_| {})?;
/// println!("{} files written", report.exported_count());
/// # Ok::<(), unstream::Error>(())
/// ```
#[derive(Debug)]
pub struct ResourceSession {
    archive: Archive,
    shards: ShardSet,
}

impl ResourceSession {
    /// Open an archive and load the given shards in priority order.
    ///
    /// Shards that cannot be opened are skipped with a warning.
    ///
    /// # Errors
    /// Returns an open or format error if the archive cannot be parsed.
    pub fn open<P: AsRef<Path>, S: AsRef<Path>>(archive: P, shard_paths: &[S]) -> Result<Self> {
        let archive = Archive::open(archive)?;
        let shards = ShardSet::load(shard_paths);
        Ok(Self { archive, shards })
    }

    /// Open an archive and discover its shards from the game's package map.
    ///
    /// `base_dir` overrides the search for the enclosing `base` directory;
    /// `priority` shard names are consulted first when present.
    ///
    /// # Errors
    /// Returns an open or format error if the archive cannot be parsed.
    pub fn open_discover<P: AsRef<Path>>(
        archive: P,
        base_dir: Option<&Path>,
        priority: &[String],
    ) -> Result<Self> {
        let archive = Archive::open(archive)?;
        let shards = ShardSet::discover(&archive.path, base_dir, priority);
        Ok(Self { archive, shards })
    }

    /// Wrap an archive and shards that were loaded elsewhere.
    #[must_use]
    pub fn from_parts(archive: Archive, shards: ShardSet) -> Self {
        Self { archive, shards }
    }

    #[must_use]
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.archive.entries
    }

    #[must_use]
    pub fn shards(&self) -> &ShardSet {
        &self.shards
    }

    /// Export the selected entries under `output_root`.
    ///
    /// # Errors
    /// Job failures are recorded in the report; see [`ExportManager::export`].
    pub fn export<P: AsRef<Path>>(
        &self,
        selection: &[Selection],
        output_root: P,
        codec: &dyn Decompressor,
        options: ExportOptions,
        progress: ProgressCallback,
    ) -> Result<ExportReport> {
        ExportManager::new(codec, &self.shards, options).export(
            &self.archive,
            selection,
            output_root.as_ref(),
            progress,
        )
    }

    /// Export every entry that has a payload.
    ///
    /// # Errors
    /// See [`ResourceSession::export`].
    pub fn export_all<P: AsRef<Path>>(
        &self,
        output_root: P,
        codec: &dyn Decompressor,
        options: ExportOptions,
        progress: ProgressCallback,
    ) -> Result<ExportReport> {
        let selection = select_all(self.entries());
        self.export(&selection, output_root, codec, options, progress)
    }

    /// Export entries by name.
    ///
    /// # Errors
    /// See [`ResourceSession::export`].
    pub fn export_names<P: AsRef<Path>>(
        &self,
        names: &[&str],
        output_root: P,
        codec: &dyn Decompressor,
        options: ExportOptions,
        progress: ProgressCallback,
    ) -> Result<ExportReport> {
        let selection = select_names(self.entries(), names);
        self.export(&selection, output_root, codec, options, progress)
    }
}
