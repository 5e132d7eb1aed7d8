//! Options for export requests

use std::fmt;
use std::sync::Arc;

use crate::reconstruct::{DdsTextureSink, ModelSink, RawModelSink, TextureSink};

use super::types::CancelFlag;

/// Options controlling an export.
///
/// # Example
///
/// ```
/// use unstream::export::ExportOptions;
///
/// let options = ExportOptions::new().with_max_depth(Some(4));
/// assert_eq!(options.max_depth, Some(4));
/// ```
#[derive(Clone)]
pub struct ExportOptions {
    /// Deepest nested container level to unpack (`None` = unlimited)
    pub max_depth: Option<usize>,
    /// Receives reconstructed images
    pub texture_sink: Arc<dyn TextureSink>,
    /// Receives model payloads
    pub model_sink: Arc<dyn ModelSink>,
    /// Checked between jobs
    pub cancel: CancelFlag,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            texture_sink: Arc::new(DdsTextureSink),
            model_sink: Arc::new(RawModelSink),
            cancel: CancelFlag::new(),
        }
    }
}

impl fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOptions")
            .field("max_depth", &self.max_depth)
            .field("texture_extension", &self.texture_sink.extension())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ExportOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_texture_sink(mut self, sink: Arc<dyn TextureSink>) -> Self {
        self.texture_sink = sink;
        self
    }

    #[must_use]
    pub fn with_model_sink(mut self, sink: Arc<dyn ModelSink>) -> Self {
        self.model_sink = sink;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}
