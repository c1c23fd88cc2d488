//! Data structures stored by the viewer and produced while rendering documents.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset_paths::{basename_key, normalize_path};
use crate::handles::ObjectUrlFactory;

/// HTML document captured from disk and kept in the local store.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    /// Stable identifier generated at ingestion time.
    pub id: String,
    /// File name shown in listings.
    pub name: String,
    /// Normalised upload-relative path of the document.
    #[serde(default)]
    pub path: String,
    /// Raw HTML text.
    pub content: String,
    /// Size of the source file in bytes.
    #[serde(default)]
    pub size: u64,
    /// Modification time of the source file in milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_modified: i64,
    /// Time the document was first stored.
    pub added_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Create a new document with a freshly generated identifier.
    pub fn new(
        name: impl Into<String>,
        path: &str,
        content: impl Into<String>,
        size: u64,
        last_modified: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            path: normalize_path(path),
            content: content.into(),
            size,
            last_modified,
            added_at: Utc::now(),
        }
    }

    /// Whether this entry was captured from the same source file.
    ///
    /// Files are considered identical when their name, size and modification time match.
    pub fn same_source(&self, other: &StoredDocument) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.last_modified == other.last_modified
    }
}

/// How a resource body is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceEncoding {
    /// Decoded UTF-8 text.
    Text,
    /// Self-contained base64 `data:` URL.
    DataUrl,
}

/// Body of a resource, discriminated by encoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "encoding", rename_all = "kebab-case")]
pub enum ResourceBody {
    /// Text asset such as a stylesheet or script. Survives across sessions.
    Text {
        /// Decoded text content.
        content: String,
    },
    /// Binary asset embedded as a data URL. Only kept for the current session.
    #[serde(rename = "data-url")]
    Binary {
        /// The data URL, which doubles as the resource's handle.
        #[serde(rename = "content")]
        data_url: String,
    },
}

/// Sibling file captured alongside documents, referenced from their markup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Identifier generated at ingestion time.
    pub id: String,
    /// File name of the resource.
    pub name: String,
    /// Normalised upload-relative path used as the exact lookup key.
    pub path: String,
    /// Lowercased final path segment used by the fallback lookup.
    pub basename: String,
    /// MIME type derived from the file extension.
    pub mime: String,
    /// Stored body.
    #[serde(flatten)]
    pub body: ResourceBody,
    /// Time the resource was stored.
    pub added_at: DateTime<Utc>,
    #[serde(skip)]
    handle: OnceLock<String>,
}

impl Resource {
    /// Create a resource registered under the normalised form of `path`.
    pub fn new(
        name: impl Into<String>,
        path: &str,
        mime: impl Into<String>,
        body: ResourceBody,
    ) -> Self {
        let path = normalize_path(path);
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            basename: basename_key(&path),
            path,
            mime: mime.into(),
            body,
            added_at: Utc::now(),
            handle: OnceLock::new(),
        }
    }

    /// Encoding of the stored body.
    pub fn encoding(&self) -> ResourceEncoding {
        match self.body {
            ResourceBody::Text { .. } => ResourceEncoding::Text,
            ResourceBody::Binary { .. } => ResourceEncoding::DataUrl,
        }
    }

    /// Whether the resource is kept when the session is reloaded.
    pub fn is_persistent(&self) -> bool {
        self.encoding() == ResourceEncoding::Text
    }

    /// Return the local handle for this resource, creating it on first use.
    pub fn handle(&self, factory: &dyn ObjectUrlFactory) -> String {
        match &self.body {
            ResourceBody::Text { content } => self
                .handle
                .get_or_init(|| factory.create(&text_mime(&self.mime), content.as_bytes()))
                .clone(),
            ResourceBody::Binary { data_url } => data_url.clone(),
        }
    }

    /// The generated handle, if one has been created.
    pub fn generated_handle(&self) -> Option<&str> {
        self.handle.get().map(String::as_str)
    }
}

fn text_mime(mime: &str) -> String {
    if mime.to_ascii_lowercase().contains("charset=") {
        mime.to_string()
    } else {
        format!("{mime};charset=utf-8")
    }
}

/// Result of rewriting a document's resource references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutput {
    /// Rewritten HTML text.
    pub html: String,
    /// Unresolved references in first-seen order, without duplicates.
    pub missing: Vec<String>,
}

/// A stored document prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Identifier of the rendered document.
    pub id: String,
    /// File name of the rendered document.
    pub name: String,
    /// HTML ready for an isolated preview surface.
    pub html: String,
    /// References that could not be resolved against the stored resources.
    pub missing: Vec<String>,
    /// Set when rewriting failed and the stored content is shown unmodified.
    pub fell_back: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::DataUrlFactory;

    #[test]
    fn resource_paths_and_basenames_are_normalised() {
        let resource = Resource::new(
            "Logo.PNG",
            "site\\img\\..\\assets\\Logo.PNG",
            "image/png",
            ResourceBody::Binary {
                data_url: "data:image/png;base64,AA==".into(),
            },
        );
        assert_eq!(resource.path, "site/assets/Logo.PNG");
        assert_eq!(resource.basename, "logo.png");
        assert!(!resource.is_persistent());
    }

    #[test]
    fn text_handles_are_created_once() {
        let resource = Resource::new(
            "main.css",
            "main.css",
            "text/css",
            ResourceBody::Text {
                content: "body{}".into(),
            },
        );
        assert!(resource.generated_handle().is_none());

        let first = resource.handle(&DataUrlFactory);
        assert!(first.starts_with("data:text/css;charset=utf-8;base64,"));
        assert_eq!(resource.generated_handle(), Some(first.as_str()));
        assert_eq!(resource.handle(&DataUrlFactory), first);
    }

    #[test]
    fn binary_handle_is_the_stored_data_url() {
        let resource = Resource::new(
            "a.png",
            "a.png",
            "image/png",
            ResourceBody::Binary {
                data_url: "data:image/png;base64,AA==".into(),
            },
        );
        assert_eq!(resource.handle(&DataUrlFactory), "data:image/png;base64,AA==");
        assert!(resource.generated_handle().is_none());
    }

    #[test]
    fn serialises_encoding_tag() {
        let resource = Resource::new(
            "app.js",
            "js/app.js",
            "text/javascript",
            ResourceBody::Text {
                content: "run()".into(),
            },
        );
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["encoding"], "text");
        assert_eq!(json["content"], "run()");

        let restored: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(restored.body, resource.body);
        assert_eq!(restored.path, "js/app.js");
    }

    #[test]
    fn identifies_documents_from_the_same_source() {
        let first = StoredDocument::new("a.html", "a.html", "<p>1</p>", 8, 1000);
        let mut second = StoredDocument::new("a.html", "dir/a.html", "<p>2</p>", 8, 1000);
        assert!(first.same_source(&second));
        second.last_modified = 2000;
        assert!(!first.same_source(&second));
    }
}
