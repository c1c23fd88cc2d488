//! Factories for the local handles that rewritten documents point at.

use std::fmt;

use base64::{Engine as _, engine::general_purpose};

/// Mints and releases local references to in-memory resource bodies.
///
/// A handle is created at most once per resource and cached on it. The index calls
/// [`ObjectUrlFactory::revoke`] when a resource carrying a handle is superseded or removed.
pub trait ObjectUrlFactory: fmt::Debug + Send + Sync {
    /// Create a handle for a body with the given MIME type.
    fn create(&self, mime: &str, body: &[u8]) -> String;

    /// Release a handle previously returned by [`ObjectUrlFactory::create`].
    fn revoke(&self, url: &str);
}

/// Factory producing self-contained `data:` URLs.
///
/// Data URLs embed the body directly, so revoking one has nothing to release.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlFactory;

impl ObjectUrlFactory for DataUrlFactory {
    fn create(&self, mime: &str, body: &[u8]) -> String {
        encode_data_url(mime, body)
    }

    fn revoke(&self, _url: &str) {}
}

/// Encode a body as a base64 `data:` URL.
pub fn encode_data_url(mime: &str, body: &[u8]) -> String {
    format!(
        "data:{mime};base64,{encoded}",
        encoded = general_purpose::STANDARD.encode(body)
    )
}
