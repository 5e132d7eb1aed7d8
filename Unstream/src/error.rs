//! Error types for `Unstream`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `Unstream` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Archive Open Errors ====================
    /// The archive file could not be opened or read.
    #[error("failed to open archive {path}: {source}")]
    ArchiveOpen {
        /// The archive path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The file extension does not name a supported archive variant.
    #[error("unsupported archive type: {path}")]
    UnsupportedArchive {
        /// The archive path.
        path: PathBuf,
    },

    // ==================== Container Format Errors ====================
    /// The container does not start with the IDCL magic.
    #[error("invalid container magic: expected IDCL, found {found:#010x}")]
    InvalidContainerMagic {
        /// The magic value found.
        found: u32,
    },

    /// A streamdb shard does not start with the expected magic.
    #[error("invalid streamdb magic in {path}: found {found:#018x}")]
    InvalidStreamDbMagic {
        /// The shard path.
        path: PathBuf,
        /// The magic value found.
        found: u64,
    },

    /// A table or record ended before its declared size.
    #[error("truncated data while reading {context}")]
    TruncatedData {
        /// What was being read.
        context: String,
    },

    /// A string table index points outside the table.
    #[error("invalid string index {index} (table has {len} strings)")]
    InvalidStringIndex {
        /// The index requested.
        index: u64,
        /// Number of strings in the table.
        len: usize,
    },

    /// The image container header is malformed.
    #[error("invalid image header in {name}: {message}")]
    InvalidImageHeader {
        /// The entry name.
        name: String,
        /// Description of what is invalid.
        message: String,
    },

    /// Invalid format error (use specific variants when possible).
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    // ==================== StreamDB Errors ====================
    /// No shard holds the payload, neither under the derived key nor its retry key.
    #[error("stream data for {name} not found (key {key:#018x})")]
    StreamResolutionMiss {
        /// The entry name.
        name: String,
        /// The primary key that was searched.
        key: u64,
    },

    // ==================== Compression Errors ====================
    /// The decompression primitive rejected the data or produced nothing.
    #[error("decompression failed for {name}: {message}")]
    DecompressionFailed {
        /// The entry name.
        name: String,
        /// The error message.
        message: String,
    },

    /// No decompression primitive is available.
    #[error("decompressor unavailable: {message}")]
    CodecUnavailable {
        /// Why the primitive could not be used.
        message: String,
    },

    // ==================== Texture Errors ====================
    /// The image container uses a texture format with no DXGI mapping.
    #[error("unsupported texture format: {format}")]
    UnsupportedTextureFormat {
        /// The raw format code.
        format: i32,
    },

    /// Failed to build a DDS container.
    #[error("failed to create DDS: {message}")]
    DdsCreateFailed {
        /// The error message.
        message: String,
    },

    // ==================== Parsing Errors ====================
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ==================== File System Errors ====================
    /// Invalid file path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Coarse classification used by front ends to decide how to report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The archive could not be opened.
    Open,
    /// The archive or one of its records is malformed.
    Format,
    /// A streamed payload was not found in any shard.
    ResolutionMiss,
    /// The decompression primitive failed or is missing.
    Codec,
    /// Anything else (IO while writing outputs, config).
    Other,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ArchiveOpen { .. } | Self::UnsupportedArchive { .. } => ErrorClass::Open,
            Self::InvalidContainerMagic { .. }
            | Self::InvalidStreamDbMagic { .. }
            | Self::TruncatedData { .. }
            | Self::InvalidStringIndex { .. }
            | Self::InvalidImageHeader { .. }
            | Self::InvalidFormat(_) => ErrorClass::Format,
            Self::StreamResolutionMiss { .. } => ErrorClass::ResolutionMiss,
            Self::DecompressionFailed { .. } | Self::CodecUnavailable { .. } => ErrorClass::Codec,
            _ => ErrorClass::Other,
        }
    }

    /// Whether this error ends the whole request when raised by the top-level parse.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Open | ErrorClass::Format)
    }

    /// Short headline plus detail, as shown by front ends.
    #[must_use]
    pub fn summary(&self) -> (&'static str, String) {
        let headline = match self.class() {
            ErrorClass::Open => "Failed to open archive",
            ErrorClass::Format => "Archive is malformed",
            ErrorClass::ResolutionMiss => "Streamed data not found",
            ErrorClass::Codec => "Decompression failed",
            ErrorClass::Other => "Export error",
        };
        (headline, self.to_string())
    }

    /// Build a truncation error, mapping `UnexpectedEof` from a cursor read.
    pub(crate) fn truncated(context: impl Into<String>) -> Self {
        Self::TruncatedData {
            context: context.into(),
        }
    }
}

/// A specialized Result type for `Unstream` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_format_errors_are_fatal() {
        let open = Error::UnsupportedArchive {
            path: PathBuf::from("a.zip"),
        };
        let format = Error::InvalidContainerMagic { found: 0 };
        let miss = Error::StreamResolutionMiss {
            name: "x".into(),
            key: 1,
        };

        assert!(open.is_fatal());
        assert!(format.is_fatal());
        assert!(!miss.is_fatal());
        assert_eq!(miss.class(), ErrorClass::ResolutionMiss);
    }

    #[test]
    fn test_codec_error_names_entry() {
        let err = Error::DecompressionFailed {
            name: "textures/a.tga".into(),
            message: "zero bytes".into(),
        };
        let (headline, detail) = err.summary();
        assert_eq!(headline, "Decompression failed");
        assert!(detail.contains("textures/a.tga"));
    }
}
