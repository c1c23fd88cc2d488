//! Index of stored resources keyed by normalised path and by basename.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::asset_paths::{basename_key, normalize_path};
use crate::handles::{DataUrlFactory, ObjectUrlFactory};
use crate::models::Resource;

/// Exact and fallback lookup tables over the resources captured from uploads.
///
/// The index is read-only during a rewrite pass; callers must not mutate it concurrently.
#[derive(Debug, Clone)]
pub struct ResourceIndex {
    by_path: BTreeMap<String, Resource>,
    by_basename: BTreeMap<String, Vec<String>>,
    urls: Arc<dyn ObjectUrlFactory>,
}

impl Default for ResourceIndex {
    fn default() -> Self {
        Self::new(Arc::new(DataUrlFactory))
    }
}

impl ResourceIndex {
    /// Create an empty index that mints handles with the provided factory.
    pub fn new(urls: Arc<dyn ObjectUrlFactory>) -> Self {
        Self {
            by_path: BTreeMap::new(),
            by_basename: BTreeMap::new(),
            urls,
        }
    }

    /// Register a resource, replacing any resource stored under the same normalised path.
    ///
    /// The superseded resource is returned after its generated handle has been revoked. A
    /// replaced path keeps its original position in the basename fallback order.
    pub fn insert(&mut self, mut resource: Resource) -> Option<Resource> {
        resource.path = normalize_path(&resource.path);
        resource.basename = basename_key(&resource.path);

        let paths = self
            .by_basename
            .entry(resource.basename.clone())
            .or_default();
        if !paths.contains(&resource.path) {
            paths.push(resource.path.clone());
        }

        let previous = self.by_path.insert(resource.path.clone(), resource);
        if let Some(previous) = &previous {
            debug!(path = %previous.path, "superseding stored resource");
            self.release(previous);
        }
        previous
    }

    /// Remove the resource stored under `path`, revoking its handle.
    pub fn remove(&mut self, path: &str) -> Option<Resource> {
        let key = normalize_path(path);
        let removed = self.by_path.remove(&key)?;

        if let Some(paths) = self.by_basename.get_mut(&removed.basename) {
            paths.retain(|candidate| candidate != &key);
            if paths.is_empty() {
                self.by_basename.remove(&removed.basename);
            }
        }

        self.release(&removed);
        Some(removed)
    }

    /// Drop every resource that should not survive a session reload.
    pub fn retain_persistent(&mut self) {
        let transient: Vec<String> = self
            .by_path
            .values()
            .filter(|resource| !resource.is_persistent())
            .map(|resource| resource.path.clone())
            .collect();
        for path in transient {
            self.remove(&path);
        }
    }

    /// Remove every resource, revoking all generated handles.
    pub fn clear(&mut self) {
        for resource in self.by_path.values() {
            self.release(resource);
        }
        self.by_path.clear();
        self.by_basename.clear();
    }

    /// Look up a resource by its exact normalised path.
    pub fn get(&self, path: &str) -> Option<&Resource> {
        self.by_path.get(path)
    }

    /// Look up the first resource registered with the given basename, ignoring case.
    pub fn get_by_basename(&self, basename: &str) -> Option<&Resource> {
        let paths = self.by_basename.get(&basename.to_lowercase())?;
        if paths.len() > 1 {
            debug!(
                basename,
                candidates = paths.len(),
                chosen = %paths[0],
                "ambiguous basename match"
            );
        }
        paths.first().and_then(|path| self.by_path.get(path))
    }

    /// Local handle for a resource, minting it with the index factory on first use.
    pub fn handle_for(&self, resource: &Resource) -> String {
        resource.handle(self.urls.as_ref())
    }

    /// Iterate over every stored resource in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.by_path.values()
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    /// Returns `true` when no resources are stored.
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    fn release(&self, resource: &Resource) {
        if let Some(url) = resource.generated_handle() {
            self.urls.revoke(url);
        }
    }
}

impl Extend<Resource> for ResourceIndex {
    fn extend<I: IntoIterator<Item = Resource>>(&mut self, iter: I) {
        for resource in iter {
            self.insert(resource);
        }
    }
}
