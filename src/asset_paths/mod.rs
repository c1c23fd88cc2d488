//! Helpers for normalising and resolving resource paths referenced by stored documents.
//!
//! The responsibilities are split into focused submodules so that filtering external
//! references, normalising upload-relative paths and expanding lookup candidates can be
//! tested independently. The rewriter, the resource index and folder ingestion all share
//! the same normalisation so that every map key is spelled the same way.

mod candidates;
mod filters;
mod normalize;

pub use candidates::lookup_candidates;
pub use filters::{is_external_reference, strip_query_and_fragment};
pub use normalize::{basename_key, directory_of, normalize_path, resolve_reference};
