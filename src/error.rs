//! Error types shared across the viewer.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while rewriting a document's resource references.
///
/// Parse failures never surface here; the rewriter degrades to returning the input.
#[derive(Error, Debug)]
pub enum RewriteError {
    /// The collected attribute edits could not be spliced back into the document.
    #[error("failed to serialize rewritten document: {0}")]
    Serialize(String),
}

/// Failures raised by the local key/value store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store could not be read or written.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },
    /// A value could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Writing the value would grow the store beyond its quota.
    #[error("storage quota exceeded: {required} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Size the store would have after the write.
        required: usize,
        /// Configured quota in bytes.
        quota: usize,
    },
}

/// Errors surfaced by [`crate::ViewerSession`] operations.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// No stored document carries the requested id.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
