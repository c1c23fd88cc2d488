#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod config;
pub mod error;
pub mod handles;
pub mod html;
pub mod ingest;
pub mod models;
pub mod resources;
pub mod rewrite;
pub mod session;
pub mod storage;

pub use config::ViewerConfig;
pub use error::{RewriteError, StorageError, ViewerError};
pub use handles::{DataUrlFactory, ObjectUrlFactory};
pub use ingest::{FileClassifier, Ingested, IngestedFile, collect_files};
pub use models::{RenderedDocument, Resource, ResourceBody, RewriteOutput, StoredDocument};
pub use resources::ResourceIndex;
pub use rewrite::rewrite;
pub use session::{AddOutcome, PLACEHOLDER_HTML, ViewerSession};
pub use storage::LocalStore;
