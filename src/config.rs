//! Viewer configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ingest::{CollectOptions, FileClassifier};

const DEFAULT_CONFIG_FILE: &str = "offline-viewer.config.json";

/// Discoverable configuration describing where documents are stored and how uploads are
/// classified.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Path of the key/value store, relative to the directory the config was discovered in.
    pub storage_file: String,
    /// Maximum size of the store in bytes.
    pub storage_quota_bytes: usize,
    /// Extensions treated as HTML documents.
    pub document_extensions: Vec<String>,
    /// Extensions stored as decoded text rather than data URLs.
    pub text_extensions: Vec<String>,
    /// Whether dot-files and dot-folders are picked up from folder uploads.
    pub include_hidden: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            storage_file: ".offline-viewer/storage.json".into(),
            storage_quota_bytes: 5 * 1024 * 1024,
            document_extensions: vec!["html".into(), "htm".into(), "xhtml".into()],
            text_extensions: vec![
                "css".into(),
                "js".into(),
                "mjs".into(),
                "json".into(),
                "svg".into(),
                "txt".into(),
                "map".into(),
                "xml".into(),
                "csv".into(),
                "webmanifest".into(),
            ],
            include_hidden: false,
        }
    }
}

impl ViewerConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// When the configuration file does not exist or fails to parse we fall back to default
    /// values so the viewer keeps working with sensible assumptions.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        Self::from_path(&candidate).unwrap_or_default()
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Location of the store resolved against `base_dir`.
    pub fn storage_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.storage_file)
    }

    /// Classifier built from the configured extension lists.
    pub fn classifier(&self) -> FileClassifier {
        FileClassifier::new(
            self.document_extensions.iter().cloned(),
            self.text_extensions.iter().cloned(),
        )
    }

    /// Folder walking options, excluding the store itself.
    pub fn collect_options(&self, base_dir: &Path) -> CollectOptions {
        CollectOptions {
            include_hidden: self.include_hidden,
            exclude: Some(self.storage_path(base_dir)),
        }
    }
}
