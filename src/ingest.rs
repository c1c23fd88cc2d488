//! Reading files from disk and classifying them into documents and resources.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result, anyhow};
use same_file::is_same_file;
use tracing::debug;

use crate::asset_paths::normalize_path;
use crate::handles::encode_data_url;
use crate::models::{Resource, ResourceBody, StoredDocument};

/// Raw file captured from disk, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    /// File name without directories.
    pub name: String,
    /// Upload-relative path. Folder uploads are prefixed with the folder name.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub last_modified: i64,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Storage category of an ingested file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// HTML document shown in the viewer.
    Document,
    /// Resource stored as decoded text.
    TextResource,
    /// Resource stored as a base64 data URL.
    BinaryResource,
}

/// A classified upload.
#[derive(Debug, Clone)]
pub enum Ingested {
    /// HTML document.
    Document(StoredDocument),
    /// Sibling resource.
    Resource(Resource),
}

/// Extension-based classification rules.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    document_extensions: BTreeSet<String>,
    text_extensions: BTreeSet<String>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(
            ["html", "htm", "xhtml"].map(String::from),
            [
                "css",
                "js",
                "mjs",
                "json",
                "svg",
                "txt",
                "map",
                "xml",
                "csv",
                "webmanifest",
            ]
            .map(String::from),
        )
    }
}

impl FileClassifier {
    /// Build a classifier from document and text extension lists.
    ///
    /// Extensions are compared case-insensitively and may be written with a leading dot.
    pub fn new(
        document_extensions: impl IntoIterator<Item = String>,
        text_extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            document_extensions: normalise_extensions(document_extensions),
            text_extensions: normalise_extensions(text_extensions),
        }
    }

    /// Decide how a file at `path` is stored.
    pub fn classify(&self, path: &str) -> FileKind {
        let extension = extension_of(path);
        if self.document_extensions.contains(&extension) {
            FileKind::Document
        } else if self.text_extensions.contains(&extension) {
            FileKind::TextResource
        } else {
            FileKind::BinaryResource
        }
    }

    /// Convert a raw file into a stored document or resource.
    pub fn ingest(&self, file: IngestedFile) -> Ingested {
        let mime = mime_for_path(&file.relative_path);
        match self.classify(&file.relative_path) {
            FileKind::Document => Ingested::Document(StoredDocument::new(
                file.name,
                &file.relative_path,
                String::from_utf8_lossy(&file.bytes).into_owned(),
                file.size,
                file.last_modified,
            )),
            FileKind::TextResource => Ingested::Resource(Resource::new(
                file.name,
                &file.relative_path,
                mime,
                ResourceBody::Text {
                    content: String::from_utf8_lossy(&file.bytes).into_owned(),
                },
            )),
            FileKind::BinaryResource => Ingested::Resource(Resource::new(
                file.name,
                &file.relative_path,
                mime,
                ResourceBody::Binary {
                    data_url: encode_data_url(mime, &file.bytes),
                },
            )),
        }
    }
}

fn normalise_extensions(values: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|value| value.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn extension_of(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => extension.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// MIME type for a file path, derived from its extension.
pub fn mime_for_path(path: &str) -> &'static str {
    match extension_of(path).as_str() {
        "html" | "htm" => "text/html",
        "xhtml" => "application/xhtml+xml",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "vtt" => "text/vtt",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "ogg" | "oga" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Options controlling which files [`collect_files`] picks up.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Include files and folders whose names start with a dot.
    pub include_hidden: bool,
    /// File that must never be ingested, typically the viewer's own store.
    pub exclude: Option<PathBuf>,
}

/// Read the given files and folders from disk.
///
/// Plain files are registered under their file name. Folders are walked recursively and
/// every file is registered under `<folder name>/<relative path>`, the way a browser
/// folder upload reports relative paths.
pub fn collect_files(paths: &[PathBuf], options: &CollectOptions) -> Result<Vec<IngestedFile>> {
    let mut files = Vec::new();

    for path in paths {
        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;

        if metadata.is_dir() {
            collect_recursively(path, Path::new(&name), options, &mut files)?;
        } else if !is_excluded(path, options) {
            files.push(read_file(path, &name)?);
        }
    }

    Ok(files)
}

fn collect_recursively(
    dir: &Path,
    relative_root: &Path,
    options: &CollectOptions,
    files: &mut Vec<IngestedFile>,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list directory {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        let name_str = file_name.to_string_lossy();
        if !options.include_hidden && name_str.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let next_relative = relative_root.join(&file_name);
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", path.display()))?;

        if file_type.is_dir() {
            collect_recursively(&path, &next_relative, options, files)?;
        } else if file_type.is_file() && !is_excluded(&path, options) {
            let relative = normalize_path(&next_relative.to_string_lossy());
            files.push(read_file(&path, &relative)?);
        }
    }

    Ok(())
}

fn is_excluded(path: &Path, options: &CollectOptions) -> bool {
    let Some(excluded) = &options.exclude else {
        return false;
    };
    let same = is_same_file(path, excluded).unwrap_or(false);
    if same {
        debug!(path = %path.display(), "skipping viewer store during ingestion");
    }
    same
}

fn read_file(path: &Path, relative_path: &str) -> Result<IngestedFile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to read metadata for {}", path.display()))?;
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or_default();
    let name = relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
        .to_string();

    Ok(IngestedFile {
        name,
        relative_path: relative_path.to_string(),
        size: metadata.len(),
        last_modified,
        bytes,
    })
}
