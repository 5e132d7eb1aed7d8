//! Export of selected entries to disk
//!
//! Selections are bucketed by type, matched against the archive's entries
//! and turned into jobs. Nested containers are unpacked through an explicit
//! work stack.

mod batch;
mod manager;
mod options;
mod paths;
mod types;

// Primary public API
pub use manager::{ExportManager, select_all, select_names};
pub use options::ExportOptions;

pub use paths::{build_output_path, relative_entry_path, resource_folder};
pub use types::{
    CancelFlag, ExportJob, ExportPhase, ExportProgress, ExportReport, ExportType, JobOutcome,
    JobReport, ProgressCallback, Selection,
};

// Re-export batch operations
pub use batch::{BatchExportResult, batch_export, find_archives};
