//! Types for export jobs and reports

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::container::Entry;

/// Semantic type of an entry, decided by its version code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportType {
    /// Declaration text (0)
    Declaration,
    /// Compressed blob with a 16 byte header (1)
    CompressedBlob,
    /// Image container (21)
    Image,
    /// Model with embedded geometry (31)
    ModelEmbedded,
    /// Model with streamed geometry (67)
    ModelStreamed,
    /// Nested container (99)
    Nested,
    /// Anything else, written as stored
    Raw,
}

impl ExportType {
    /// Map a version code.
    #[must_use]
    pub fn from_version(version: u32) -> Self {
        match version {
            0 => Self::Declaration,
            1 => Self::CompressedBlob,
            21 => Self::Image,
            31 => Self::ModelEmbedded,
            67 => Self::ModelStreamed,
            99 => Self::Nested,
            _ => Self::Raw,
        }
    }

    /// Type of an entry; nested containers override the version code.
    #[must_use]
    pub fn of(entry: &Entry) -> Self {
        if entry.nested {
            Self::Nested
        } else {
            Self::from_version(entry.version)
        }
    }

    /// Version code, or `None` for [`ExportType::Raw`].
    #[must_use]
    pub fn code(self) -> Option<u32> {
        match self {
            Self::Declaration => Some(0),
            Self::CompressedBlob => Some(1),
            Self::Image => Some(21),
            Self::ModelEmbedded => Some(31),
            Self::ModelStreamed => Some(67),
            Self::Nested => Some(99),
            Self::Raw => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Declaration => "declaration",
            Self::CompressedBlob => "compressed",
            Self::Image => "image",
            Self::ModelEmbedded => "model",
            Self::ModelStreamed => "streamed model",
            Self::Nested => "nested",
            Self::Raw => "raw",
        }
    }
}

/// One requested entry: name, declared type code and nested flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub version: u32,
    pub nested: bool,
}

impl Selection {
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32, nested: bool) -> Self {
        Self {
            name: name.into(),
            version,
            nested,
        }
    }

    /// Select an entry exactly as parsed.
    #[must_use]
    pub fn of(entry: &Entry) -> Self {
        Self::new(entry.name.clone(), entry.version, entry.nested)
    }

    /// The type this selection is bucketed under.
    #[must_use]
    pub fn export_type(&self) -> ExportType {
        if self.nested {
            ExportType::Nested
        } else {
            ExportType::from_version(self.version)
        }
    }
}

/// Result of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output written to this path
    Exported(PathBuf),
    /// Nested container unpacked; its contents were queued for export
    Unpacked(PathBuf),
    /// The job failed; the message names the entry
    Failed(String),
}

impl JobOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// One export job: an entry bound to a type and output path.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub entry: Entry,
    pub export_type: ExportType,
    pub output_path: PathBuf,
}

/// A finished job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub name: String,
    pub export_type: ExportType,
    pub output_path: PathBuf,
    /// Nesting depth (0 for the opened archive)
    pub depth: usize,
    pub outcome: JobOutcome,
}

/// Result of an export request.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// False only when the selection was empty
    pub accepted: bool,
    pub jobs: Vec<JobReport>,
    /// Selected entries without payload (zero size or empty placeholder)
    pub skipped: Vec<String>,
    /// The request was cancelled between jobs
    pub cancelled: bool,
}

impl ExportReport {
    /// Paths of every file written.
    pub fn exported_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.jobs.iter().filter_map(|job| match &job.outcome {
            JobOutcome::Exported(path) => Some(path),
            _ => None,
        })
    }

    #[must_use]
    pub fn exported_count(&self) -> usize {
        self.exported_paths().count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.jobs.iter().filter(|job| !job.outcome.is_success()).count()
    }

    /// Failed jobs as (entry name, message).
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.jobs
            .iter()
            .filter_map(|job| match &job.outcome {
                JobOutcome::Failed(message) => Some((job.name.as_str(), message.as_str())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.accepted && !self.cancelled && self.failed_count() == 0
    }
}

/// Progress information during an export
#[derive(Debug, Clone)]
pub struct ExportProgress {
    pub phase: ExportPhase,
    /// Current job number (1-indexed)
    pub current: usize,
    /// Jobs queued so far
    pub total: usize,
    pub current_file: Option<String>,
}

impl ExportProgress {
    #[must_use]
    pub fn new(phase: ExportPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    #[must_use]
    pub fn with_file(phase: ExportPhase, current: usize, total: usize, file: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    /// Matching entries against the selection
    Classifying,
    /// Running export jobs
    Exporting,
    /// Unpacking a nested container
    Unpacking,
    /// Operation complete
    Complete,
}

impl ExportPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classifying => "Classifying entries",
            Self::Exporting => "Exporting",
            Self::Unpacking => "Unpacking nested container",
            Self::Complete => "Complete",
        }
    }
}

/// Progress callback type
pub type ProgressCallback<'a> = &'a (dyn Fn(&ExportProgress) + Sync + Send);

/// Cooperative cancellation, checked between jobs.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_flag_forces_nested_type() {
        assert_eq!(Selection::new("a", 21, true).export_type(), ExportType::Nested);
        assert_eq!(Selection::new("a", 21, false).export_type(), ExportType::Image);
        assert_eq!(Selection::new("a", 5, false).export_type(), ExportType::Raw);
    }

    #[test]
    fn test_type_codes() {
        for code in [0, 1, 21, 31, 67, 99] {
            assert_eq!(ExportType::from_version(code).code(), Some(code));
        }
        assert_eq!(ExportType::from_version(9999).code(), None);
    }
}
