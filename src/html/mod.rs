//! Lightweight HTML tokenisation used by the reference rewriter.
//!
//! Documents are never rebuilt from a tree. The scanner records byte spans for start tags
//! and attribute values, the rewriter collects replacement edits against those spans and
//! the serializer splices them back in, so untouched markup survives byte for byte.

mod doctype;
mod entities;
mod scanner;
mod serialize;
mod srcset;

pub use doctype::Doctype;
pub use entities::{decode_entities, escape_attribute};
pub use scanner::{Attribute, StartTag, scan_start_tags};
pub use serialize::{Edit, serialize_document};
pub use srcset::srcset_url_spans;
