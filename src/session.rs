//! Viewer session state: stored documents, resources and the active selection.

use std::path::Path;

use tracing::{error, info, warn};

use crate::config::ViewerConfig;
use crate::error::{Result, RewriteError, StorageError, ViewerError};
use crate::ingest::Ingested;
use crate::models::{RenderedDocument, Resource, RewriteOutput, StoredDocument};
use crate::resources::ResourceIndex;
use crate::rewrite::rewrite;
use crate::storage::{LAST_VIEWED_KEY, LocalStore, SAVED_FILES_KEY, SAVED_RESOURCES_KEY};

/// Page shown when no document is selected.
pub const PLACEHOLDER_HTML: &str = "<!DOCTYPE html><html><body style=\"font-family: -apple-system, sans-serif; color: #444; padding: 1rem;\">Select or save an HTML file to see its contents.</body></html>";

/// Summary of an [`ViewerSession::add_files`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Ids of newly stored documents.
    pub added: Vec<String>,
    /// Ids of documents replaced in place.
    pub replaced: Vec<String>,
    /// Number of resources registered or updated.
    pub resources: usize,
    /// Document selected after the upload, if any.
    pub selected: Option<String>,
    /// Whether the new state reached the store.
    pub persisted: bool,
}

/// State owned by the hosting front-end and passed to every viewer operation.
#[derive(Debug, Default)]
pub struct ViewerSession {
    documents: Vec<StoredDocument>,
    active_id: Option<String>,
    resources: ResourceIndex,
    store: Option<LocalStore>,
}

impl ViewerSession {
    /// Session that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a session backed by the store described in `config`.
    ///
    /// When the store cannot be opened or refuses writes the session continues in memory
    /// only; documents stay available until the session is dropped.
    pub fn open(config: &ViewerConfig, base_dir: &Path) -> Self {
        let path = config.storage_path(base_dir);
        let store = LocalStore::open(&path, config.storage_quota_bytes).and_then(|mut store| {
            store.probe()?;
            Ok(store)
        });

        match store {
            Ok(store) => Self::with_store(store),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    %err,
                    "storage is not available, documents will not be saved"
                );
                Self::in_memory()
            }
        }
    }

    /// Load a session from an opened store.
    pub fn with_store(store: LocalStore) -> Self {
        let documents: Vec<StoredDocument> = load_or_default(&store, SAVED_FILES_KEY);
        let mut resources = ResourceIndex::default();
        resources.extend(
            load_or_default::<Vec<Resource>>(&store, SAVED_RESOURCES_KEY)
                .into_iter()
                .filter(Resource::is_persistent),
        );

        let last_viewed = store.get(LAST_VIEWED_KEY).map(str::to_string);
        let active_id = last_viewed
            .filter(|id| documents.iter().any(|document| &document.id == id))
            .or_else(|| documents.first().map(|document| document.id.clone()));

        info!(
            documents = documents.len(),
            resources = resources.len(),
            "loaded saved viewer state"
        );

        Self {
            documents,
            active_id,
            resources,
            store: Some(store),
        }
    }

    /// Whether changes are written to a store.
    pub fn storage_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Stored documents in upload order.
    pub fn documents(&self) -> &[StoredDocument] {
        &self.documents
    }

    /// Stored resources.
    pub fn resources(&self) -> &ResourceIndex {
        &self.resources
    }

    /// Id of the active document.
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// The active document.
    pub fn active(&self) -> Option<&StoredDocument> {
        let id = self.active_id.as_deref()?;
        self.documents.iter().find(|document| document.id == id)
    }

    /// Store a batch of classified uploads.
    ///
    /// Documents captured from the same source file (same name, size and modification
    /// time) replace the stored entry in place, keeping its id and original timestamp.
    /// Resources replace any resource at the same normalised path. The first document of
    /// the batch becomes the active one.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = Ingested>) -> AddOutcome {
        let mut outcome = AddOutcome::default();

        for file in files {
            match file {
                Ingested::Document(mut document) => {
                    let id = match self
                        .documents
                        .iter()
                        .position(|stored| stored.same_source(&document))
                    {
                        Some(index) => {
                            let existing = &self.documents[index];
                            document.id = existing.id.clone();
                            document.added_at = existing.added_at;
                            self.documents[index] = document;
                            outcome.replaced.push(self.documents[index].id.clone());
                            self.documents[index].id.clone()
                        }
                        None => {
                            let id = document.id.clone();
                            self.documents.push(document);
                            outcome.added.push(id.clone());
                            id
                        }
                    };
                    if outcome.selected.is_none() {
                        outcome.selected = Some(id);
                    }
                }
                Ingested::Resource(resource) => {
                    self.resources.insert(resource);
                    outcome.resources += 1;
                }
            }
        }

        if let Some(id) = &outcome.selected {
            self.active_id = Some(id.clone());
        }

        info!(
            added = outcome.added.len(),
            replaced = outcome.replaced.len(),
            resources = outcome.resources,
            "stored uploaded files"
        );
        outcome.persisted = self.persist();
        outcome
    }

    /// Make the document with `id` the active one.
    pub fn select(&mut self, id: &str) -> Result<&StoredDocument> {
        let index = self.position(id)?;
        self.active_id = Some(id.to_string());
        self.persist_last_viewed();
        Ok(&self.documents[index])
    }

    /// Remove a stored document.
    ///
    /// Removing the active document selects the first remaining one.
    pub fn remove(&mut self, id: &str) -> Result<StoredDocument> {
        let index = self.position(id)?;
        let removed = self.documents.remove(index);

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.documents.first().map(|document| document.id.clone());
        }

        info!(name = %removed.name, "removed document");
        self.persist();
        Ok(removed)
    }

    /// Forget every document and resource.
    pub fn clear(&mut self) -> bool {
        self.documents.clear();
        self.resources.clear();
        self.active_id = None;
        self.persist()
    }

    /// Render a stored document with its references resolved against the stored resources.
    ///
    /// When rewriting fails the stored content is returned unmodified.
    pub fn render(&self, id: &str) -> Result<RenderedDocument> {
        let document = &self.documents[self.position(id)?];
        let result = rewrite(&document.content, &document.path, &self.resources);
        Ok(rendered_from(document, result))
    }

    /// Render the active document, or `None` when nothing is selected.
    pub fn render_active(&self) -> Option<RenderedDocument> {
        let id = self.active_id.as_deref()?;
        self.render(id).ok()
    }

    fn position(&self, id: &str) -> Result<usize> {
        self
            .documents
            .iter()
            .position(|document| document.id == id)
            .ok_or_else(|| ViewerError::DocumentNotFound(id.to_string()))
    }

    fn persist(&mut self) -> bool {
        let Some(store) = self.store.as_mut() else {
            return false;
        };

        let persistent: Vec<&Resource> = self
            .resources
            .iter()
            .filter(|resource| resource.is_persistent())
            .collect();

        let result = store
            .set_json(SAVED_FILES_KEY, &self.documents)
            .and_then(|_| store.set_json(SAVED_RESOURCES_KEY, &persistent));
        let saved = report_storage_result(result, "cannot save files");
        saved && self.persist_last_viewed()
    }

    fn persist_last_viewed(&mut self) -> bool {
        let Some(store) = self.store.as_mut() else {
            return false;
        };

        let result = match &self.active_id {
            Some(id) => store.set(LAST_VIEWED_KEY, id.clone()),
            None => store.remove(LAST_VIEWED_KEY),
        };
        report_storage_result(result, "cannot store last viewed id")
    }
}

fn rendered_from(
    document: &StoredDocument,
    result: std::result::Result<RewriteOutput, RewriteError>,
) -> RenderedDocument {
    let rendered = match result {
        Ok(output) => RenderedDocument {
            id: document.id.clone(),
            name: document.name.clone(),
            html: output.html,
            missing: output.missing,
            fell_back: false,
        },
        Err(err) => {
            warn!(name = %document.name, %err, "rewrite failed, showing stored content");
            RenderedDocument {
                id: document.id.clone(),
                name: document.name.clone(),
                html: document.content.clone(),
                missing: Vec::new(),
                fell_back: true,
            }
        }
    };

    if !rendered.missing.is_empty() {
        warn!(
            name = %document.name,
            missing = rendered.missing.len(),
            "some references could not be resolved"
        );
    }
    rendered
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(store: &LocalStore, key: &str) -> T {
    match store.get_json(key) {
        Ok(value) => value.unwrap_or_default(),
        Err(err) => {
            error!(key, %err, "cannot parse saved value");
            T::default()
        }
    }
}

fn report_storage_result(result: std::result::Result<(), StorageError>, message: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            error!(%err, "{message}");
            false
        }
    }
}
