//! Rewrite resource references in a stored document to point at local handles.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::asset_paths::{
    basename_key, directory_of, is_external_reference, lookup_candidates, strip_query_and_fragment,
};
use crate::error::RewriteError;
use crate::html::{
    Edit, StartTag, escape_attribute, scan_start_tags, serialize_document, srcset_url_spans,
};
use crate::models::{Resource, RewriteOutput};
use crate::resources::ResourceIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Single,
    SrcSet,
}

/// Element/attribute pair whose value references a resource.
#[derive(Debug, Clone, Copy)]
struct AttributeRule {
    element: &'static str,
    attribute: &'static str,
    rel: Option<&'static str>,
    kind: ValueKind,
}

impl AttributeRule {
    const fn single(element: &'static str, attribute: &'static str) -> Self {
        Self {
            element,
            attribute,
            rel: None,
            kind: ValueKind::Single,
        }
    }

    const fn srcset(element: &'static str) -> Self {
        Self {
            element,
            attribute: "srcset",
            rel: None,
            kind: ValueKind::SrcSet,
        }
    }

    const fn link(rel: &'static str) -> Self {
        Self {
            element: "link",
            attribute: "href",
            rel: Some(rel),
            kind: ValueKind::Single,
        }
    }

    fn matches(&self, tag: &StartTag) -> bool {
        tag.name == self.element && self.rel.is_none_or(|rel| tag.has_rel_token(rel))
    }
}

/// Rules in processing order. Unresolved references are reported in this order.
const RULES: &[AttributeRule] = &[
    AttributeRule::single("script", "src"),
    AttributeRule::link("stylesheet"),
    AttributeRule::link("preload"),
    AttributeRule::link("icon"),
    AttributeRule::single("img", "src"),
    AttributeRule::srcset("img"),
    AttributeRule::srcset("source"),
    AttributeRule::single("source", "src"),
    AttributeRule::single("video", "src"),
    AttributeRule::single("audio", "src"),
    AttributeRule::single("track", "src"),
    AttributeRule::single("object", "data"),
    AttributeRule::single("embed", "src"),
    AttributeRule::single("iframe", "src"),
    AttributeRule::single("video", "poster"),
];

/// Rewrite every resolvable resource reference in `document_text`.
///
/// References are resolved relative to the directory of `document_path`, falling back to
/// a case-insensitive basename match. Resolved attributes are replaced with the resource's
/// local handle; unresolved ones are left as written and reported in
/// [`RewriteOutput::missing`]. An empty index, or text without markup, is returned verbatim.
pub fn rewrite(
    document_text: &str,
    document_path: &str,
    resources: &ResourceIndex,
) -> Result<RewriteOutput, RewriteError> {
    if resources.is_empty() {
        return Ok(passthrough(document_text));
    }

    let tags = scan_start_tags(document_text);
    if tags.is_empty() {
        debug!(document_path, "document has no markup, skipping rewrite");
        return Ok(passthrough(document_text));
    }

    let mut resolver = Resolver::new(directory_of(document_path), resources);
    let mut edits = Vec::new();
    let mut rewritten_spans = BTreeSet::new();

    for rule in RULES {
        for tag in tags.iter().filter(|tag| rule.matches(tag)) {
            let Some(attribute) = tag.attribute(rule.attribute) else {
                continue;
            };
            let Some(value) = attribute.value.as_deref() else {
                continue;
            };
            if rewritten_spans.contains(&attribute.value_span.start) {
                continue;
            }

            let replacement = match rule.kind {
                ValueKind::Single => resolver.resolve(value),
                ValueKind::SrcSet => resolver.resolve_srcset(value),
            };
            if let Some(replacement) = replacement {
                rewritten_spans.insert(attribute.value_span.start);
                edits.push(Edit {
                    span: attribute.value_span.clone(),
                    replacement: escape_attribute(&replacement),
                });
            }
        }
    }

    let html = serialize_document(document_text, edits)?;
    debug!(
        document_path,
        resolved = rewritten_spans.len(),
        missing = resolver.missing.len(),
        "rewrote document references"
    );

    Ok(RewriteOutput {
        html,
        missing: resolver.missing,
    })
}

fn passthrough(document_text: &str) -> RewriteOutput {
    RewriteOutput {
        html: document_text.to_string(),
        missing: Vec::new(),
    }
}

struct Resolver<'a> {
    base_dir: String,
    resources: &'a ResourceIndex,
    missing: Vec<String>,
    reported: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(base_dir: String, resources: &'a ResourceIndex) -> Self {
        Self {
            base_dir,
            resources,
            missing: Vec::new(),
            reported: HashSet::new(),
        }
    }

    /// Resolve a single reference, returning the handle to write in its place.
    fn resolve(&mut self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_external_reference(trimmed) {
            return None;
        }

        match self.find(strip_query_and_fragment(trimmed)) {
            Some(resource) => {
                debug!(reference = trimmed, path = %resource.path, "resolved reference");
                Some(self.resources.handle_for(resource))
            }
            None => {
                self.report_missing(trimmed);
                None
            }
        }
    }

    /// Resolve each candidate URL of a `srcset` value, keeping descriptors and separators.
    fn resolve_srcset(&mut self, value: &str) -> Option<String> {
        let mut rebuilt = String::with_capacity(value.len());
        let mut cursor = 0;
        let mut changed = false;

        for span in srcset_url_spans(value) {
            if let Some(handle) = self.resolve(&value[span.clone()]) {
                rebuilt.push_str(&value[cursor..span.start]);
                rebuilt.push_str(&handle);
                cursor = span.end;
                changed = true;
            }
        }

        if !changed {
            return None;
        }
        rebuilt.push_str(&value[cursor..]);
        Some(rebuilt)
    }

    fn find(&self, reference: &str) -> Option<&'a Resource> {
        let resources = self.resources;
        let exact = lookup_candidates(&self.base_dir, reference)
            .into_iter()
            .find_map(|candidate| resources.get(&candidate));
        if exact.is_some() {
            return exact;
        }

        let basename = basename_key(reference);
        if basename.is_empty() {
            return None;
        }
        resources.get_by_basename(&basename)
    }

    fn report_missing(&mut self, reference: &str) {
        if self.reported.insert(reference.to_string()) {
            debug!(reference, "unresolved reference");
            self.missing.push(reference.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resources::tests::{RecordingFactory, binary, text};

    fn index(resources: Vec<Resource>) -> ResourceIndex {
        let mut index = ResourceIndex::default();
        index.extend(resources);
        index
    }

    fn data_url(path: &str) -> String {
        let name = path.rsplit('/').next().unwrap();
        format!("data:image/png;base64,{name}")
    }

    #[test]
    fn empty_index_returns_input_verbatim() {
        let html = "<html><body><img src=\"a.png\"></body></html>";
        let output = rewrite(html, "site/index.html", &ResourceIndex::default()).unwrap();
        assert_eq!(output.html, html);
        assert!(output.missing.is_empty());
    }

    #[test]
    fn text_without_markup_is_returned_verbatim() {
        let output = rewrite("plain text", "notes.html", &index(vec![binary("a.png")])).unwrap();
        assert_eq!(output.html, "plain text");
        assert!(output.missing.is_empty());
    }

    #[test]
    fn external_references_are_untouched_and_not_reported() {
        let html = concat!(
            "<!DOCTYPE html>\n",
            "<link rel=\"stylesheet\" href=\"https://example.com/a.css\">",
            "<script src=\"//cdn.example.com/lib.js\"></script>",
            "<img src=\"data:image/gif;base64,R0lG\">",
            "<iframe src=\"#top\"></iframe>"
        );
        let output = rewrite(html, "index.html", &index(vec![binary("a.png")])).unwrap();
        assert_eq!(output.html, html);
        assert!(output.missing.is_empty());
    }

    #[test]
    fn resolves_relative_reference_against_document_directory() {
        let html = "<!DOCTYPE html>\n<html><body><img src=\"img/photo.png\" alt=\"p\"></body></html>";
        let resources = index(vec![binary("site/img/photo.png")]);
        let output = rewrite(html, "site/index.html", &resources).unwrap();

        assert_eq!(
            output.html,
            format!(
                "<!DOCTYPE html>\n<html><body><img src=\"{}\" alt=\"p\"></body></html>",
                data_url("site/img/photo.png")
            )
        );
        assert!(output.missing.is_empty());
    }

    #[test]
    fn parent_segments_resolve_to_sibling_directories() {
        let html = "<link rel=\"stylesheet\" href=\"../shared/style.css\">";
        let factory = Arc::new(RecordingFactory::default());
        let mut resources = ResourceIndex::new(factory.clone());
        resources.insert(text("pages/shared/style.css", "body{}"));

        let output = rewrite(html, "pages/sub/index.html", &resources).unwrap();

        assert!(output.missing.is_empty());
        assert!(output.html.contains("href=\"blob:test/0-body{}\""));
        assert_eq!(factory.created.lock().unwrap().len(), 1);
    }

    #[test]
    fn basename_fallback_resolves_moved_files() {
        let html = "<img src=\"assets/Logo.png\">";
        let resources = index(vec![binary("old/logo.png")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert!(output.html.contains(&data_url("old/logo.png")));
        assert!(output.missing.is_empty());
    }

    #[test]
    fn rooted_references_resolve_from_upload_root() {
        let html = "<script src=\"/js/app.js?v=3#main\"></script>";
        let resources = index(vec![text("js/app.js", "run()")]);
        let output = rewrite(html, "site/pages/index.html", &resources).unwrap();

        assert!(output.missing.is_empty());
        assert!(!output.html.contains("?v=3"));
        assert!(output.html.contains("src=\"data:text/css;charset=utf-8;base64,"));
    }

    #[test]
    fn raw_value_is_tried_when_relative_resolution_misses() {
        let html = "<img src=\"img/a.png\">";
        let resources = index(vec![binary("img/a.png"), binary("other/b.png")]);
        let output = rewrite(html, "site/index.html", &resources).unwrap();
        assert!(output.html.contains(&data_url("img/a.png")));
    }

    #[test]
    fn unresolved_references_are_reported_once_in_order() {
        let html = concat!(
            "<script src=\" missing.js \"></script>",
            "<img src=\"gone.png\"><img src=\"gone.png\">",
            "<link rel=\"stylesheet\" href=\"nope.css\">"
        );
        let resources = index(vec![binary("present.png")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert_eq!(output.missing, vec!["missing.js", "nope.css", "gone.png"]);
        assert!(output.html.contains("src=\" missing.js \""));
        assert!(output.html.contains("href=\"nope.css\""));
    }

    #[test]
    fn srcset_rewrites_every_candidate_and_keeps_descriptors() {
        let html = "<img srcset=\"a.png 1x, b.png 2x\">";
        let resources = index(vec![binary("a.png"), binary("b.png")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        let expected = format!(
            "<img srcset=\"{} 1x, {} 2x\">",
            data_url("a.png"),
            data_url("b.png")
        );
        assert!(output.html.ends_with(&expected));
        assert!(output.missing.is_empty());
    }

    #[test]
    fn srcset_candidates_without_spaces_after_commas_all_resolve() {
        let html = "<img srcset=\"a.png,b.png 2x\">";
        let resources = index(vec![binary("a.png"), binary("b.png")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert!(output.missing.is_empty());
        assert!(output.html.ends_with(&format!(
            "<img srcset=\"{},{} 2x\">",
            data_url("a.png"),
            data_url("b.png")
        )));
    }

    #[test]
    fn srcset_reports_only_unresolved_candidates() {
        let html = "<picture><source srcset=\"wide.png 1080w, narrow.png 480w\"></picture>";
        let resources = index(vec![binary("narrow.png")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert!(output.html.contains(&format!("wide.png 1080w, {} 480w", data_url("narrow.png"))));
        assert_eq!(output.missing, vec!["wide.png"]);
    }

    #[test]
    fn link_rules_require_matching_rel_tokens() {
        let html = concat!(
            "<link rel=\"canonical\" href=\"page.html\">",
            "<link rel=\"shortcut icon\" href=\"favicon.ico\">",
            "<link rel=\"stylesheet preload\" href=\"main.css\">"
        );
        let resources = index(vec![binary("favicon.ico"), text("main.css", "x")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert!(output.html.contains("href=\"page.html\""));
        assert!(!output.html.contains("href=\"favicon.ico\""));
        assert!(!output.html.contains("href=\"main.css\""));
        assert!(output.missing.is_empty());
    }

    #[test]
    fn media_object_and_frame_references_are_rewritten() {
        let html = concat!(
            "<video src=\"clip.mp4\" poster=\"poster.png\"><track src=\"subs.vtt\"></video>",
            "<audio src=\"song.mp3\"></audio>",
            "<object data=\"doc.pdf\"></object>",
            "<embed src=\"anim.swf\">",
            "<iframe src=\"inner.html\"></iframe>"
        );
        let resources = index(vec![
            binary("clip.mp4"),
            binary("poster.png"),
            binary("subs.vtt"),
            binary("song.mp3"),
            binary("doc.pdf"),
            binary("anim.swf"),
            binary("inner.html"),
        ]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert!(output.missing.is_empty());
        for name in [
            "clip.mp4",
            "poster.png",
            "subs.vtt",
            "song.mp3",
            "doc.pdf",
            "anim.swf",
            "inner.html",
        ] {
            assert!(output.html.contains(&data_url(name)), "{name} was not rewritten");
        }
    }

    #[test]
    fn rewriting_preserves_doctype_and_untouched_markup() {
        let html = concat!(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">\n",
            "<html lang=\"en\" data-theme='dark'><head><meta charset=\"utf-8\">",
            "<link rel=\"stylesheet\" href=\"css/site.css\"></head>",
            "<body class=\"main\"><a href=\"other.html\">x</a><img src=\"a.png\"></body></html>"
        );
        let resources = index(vec![text("css/site.css", "p{}"), binary("a.png")]);
        let output = rewrite(html, "index.html", &resources).unwrap();

        assert!(output.html.starts_with(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">\n"
        ));

        let original = scan_start_tags(html);
        let reparsed = scan_start_tags(&output.html);
        assert_eq!(original.len(), reparsed.len());
        assert_eq!(reparsed[0].name, "html");
        for (before, after) in original.iter().zip(&reparsed) {
            assert_eq!(before.name, after.name);
            if before.name != "link" && before.name != "img" {
                let before_values: Vec<_> =
                    before.attributes.iter().map(|a| (&a.name, &a.value)).collect();
                let after_values: Vec<_> =
                    after.attributes.iter().map(|a| (&a.name, &a.value)).collect();
                assert_eq!(before_values, after_values);
            }
        }
    }

    #[test]
    fn missing_doctype_defaults_to_html5() {
        let html = "<html><body><img src=\"a.png\"></body></html>";
        let output = rewrite(html, "index.html", &index(vec![binary("a.png")])).unwrap();
        assert!(output.html.starts_with("<!DOCTYPE html>\n<html>"));
    }

    #[test]
    fn unquoted_values_are_requoted_on_rewrite() {
        let html = "<img src=a.png alt=x>";
        let output = rewrite(html, "index.html", &index(vec![binary("a.png")])).unwrap();
        assert!(output.html.contains(&format!("<img src=\"{}\" alt=x>", data_url("a.png"))));
    }

    #[test]
    fn entity_encoded_references_are_decoded_before_lookup() {
        let html = "<img src=\"my&#32;photo.png\">";
        let output = rewrite(html, "index.html", &index(vec![binary("my photo.png")])).unwrap();
        assert!(output.missing.is_empty());
    }

    #[test]
    fn apostrophe_in_unquoted_value_keeps_later_references_visible() {
        let html = "<p title=don't>x</p><img src=\"a.png\"><p>it's</p>";
        let output = rewrite(html, "index.html", &index(vec![binary("present.png")])).unwrap();
        assert_eq!(output.missing, vec!["a.png"]);

        let output = rewrite(html, "index.html", &index(vec![binary("a.png")])).unwrap();
        assert!(output.missing.is_empty());
        assert!(output.html.contains(&format!("<img src=\"{}\">", data_url("a.png"))));
        assert!(output.html.contains("<p title=don't>"));
    }

    #[test]
    fn named_entities_are_decoded_before_lookup() {
        let html = "<img src=\"caf&eacute;.png\">";
        let output = rewrite(html, "index.html", &index(vec![binary("café.png")])).unwrap();
        assert!(output.missing.is_empty());
        assert!(output.html.contains(&data_url("café.png")));
    }

    #[test]
    fn rewriting_is_deterministic() {
        let html = "<img src=\"a.png\"><script src=\"app.js\"></script>";
        let resources = index(vec![binary("a.png"), text("app.js", "x")]);
        let first = rewrite(html, "index.html", &resources).unwrap();
        let second = rewrite(html, "index.html", &resources).unwrap();
        assert_eq!(first, second);
    }
}
