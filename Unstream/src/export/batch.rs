//! Batch export
//!
//! Exports every archive under a directory in parallel. Each archive gets
//! its own session; nothing is shared between workers except the codec and
//! the options.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use super::options::ExportOptions;
use super::types::{ExportPhase, ExportProgress};
use crate::compression::Decompressor;
use crate::container::ArchiveKind;
use crate::session::ResourceSession;

/// Result of a batch export
#[derive(Debug, Clone)]
pub struct BatchExportResult {
    /// Number of archives exported without job failures
    pub success_count: usize,
    /// Number of archives that failed to open or had failed jobs
    pub fail_count: usize,
    /// Messages for each archive processed
    pub results: Vec<String>,
}

/// Find all supported archives in a directory recursively.
///
/// # Returns
/// A sorted list of `.resources`, `.pk5` and `.wad7` files.
pub fn find_archives<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut archives: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file() && ArchiveKind::from_path(e.path()).is_ok())
        .map(|e| e.path().to_path_buf())
        .collect();

    archives.sort();
    archives
}

/// Export every entry of every archive in parallel.
///
/// Shards are discovered per archive from the game's package map;
/// `base_dir` overrides the `base` directory search.
pub fn batch_export<F>(
    archives: &[PathBuf],
    dest_base: &Path,
    codec: &dyn Decompressor,
    options: &ExportOptions,
    base_dir: Option<&Path>,
    priority_shards: &[String],
    progress: F,
) -> BatchExportResult
where
    F: Fn(&ExportProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = archives.len();

    let results: Vec<String> = archives
        .par_iter()
        .map(|path| {
            let display = path.display().to_string();
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&ExportProgress::with_file(
                ExportPhase::Exporting,
                current,
                total,
                display.clone(),
            ));

            let session = match ResourceSession::open_discover(path, base_dir, priority_shards) {
                Ok(session) => session,
                Err(e) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    return format!("Failed: {display} - {e}");
                }
            };

            match session.export_all(dest_base, codec, options.clone(), &|_| {}) {
                Ok(report) if report.failed_count() == 0 => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Exported: {display} ({} files)", report.exported_count())
                }
                Ok(report) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    format!(
                        "Partial: {display} ({} exported, {} failed)",
                        report.exported_count(),
                        report.failed_count()
                    )
                }
                Err(e) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Failed: {display} - {e}")
                }
            }
        })
        .collect();

    progress(&ExportProgress::new(ExportPhase::Complete, total, total));

    BatchExportResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        results,
    }
}
