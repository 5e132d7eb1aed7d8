//! # Unstream
//!
//! A Rust library for reading idTech resource archives and exporting their
//! assets.
//!
//! ## Supported Formats
//!
//! - **`.resources`** - Primary containers with entry table and string table
//! - **`.pk5` / `.wad7`** - Index archives with embedded sub-containers
//! - **`.streamdb`** - Shards holding streamed payloads such as top mips
//! - **Image containers** - Reassembled into DDS files
//!
//! ## Quick Start
//!
//! ### Listing an Archive
//!
//! ```no_run
//! use unstream::container::Archive;
//!
//! let archive = Archive::open("base/e1m1_intro.resources")?;
//! for entry in &archive.entries {
//!     println!("{} ({}, v{})", entry.name, entry.type_name, entry.version);
//! }
//! # Ok::<(), unstream::Error>(())
//! ```
//!
//! ### Exporting with Shard Discovery
//!
//! ```no_run
//! use unstream::compression::OodleLibrary;
//! use unstream::export::ExportOptions;
//! use unstream::session::ResourceSession;
//!
//! let codec = OodleLibrary::load("oo2core_8_win64.dll")?;
//! let session = ResourceSession::open_discover("base/e1m1_intro.resources", None, &[])?;
//! let report = session.export_all("out", &codec, ExportOptions::default(), &|_| {})?;
//! for (name, message) in report.failures() {
//!     eprintln!("{name}: {message}");
//! }
//! # Ok::<(), unstream::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use unstream::prelude::*;
//!
//! assert_eq!(ExportType::from_version(21), ExportType::Image);
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `unstream` command-line binary

pub mod compression;
pub mod config;
pub mod container;
pub mod error;
pub mod export;
pub mod reconstruct;
pub mod session;
pub mod streamdb;

// Re-exports for convenience
pub use error::{Error, ErrorClass, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, ErrorClass, Result};

    pub use crate::compression::{Decompressor, Lz4Block, OodleLibrary, Unavailable};
    pub use crate::config::Config;
    pub use crate::container::{Archive, ArchiveKind, Entry};

    // Export operations
    pub use crate::export::{
        BatchExportResult, CancelFlag, ExportOptions, ExportReport, ExportType, JobOutcome,
        Selection, batch_export, find_archives, select_all, select_names,
    };

    pub use crate::reconstruct::{ModelSink, TextureSink};
    pub use crate::session::ResourceSession;
    pub use crate::streamdb::{PackageMap, ShardSet, StreamDb, stream_key};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
