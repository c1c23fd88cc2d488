use std::ops::Range;

use super::doctype::Doctype;
use crate::error::RewriteError;

/// Replacement of a byte span in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Span being replaced.
    pub span: Range<usize>,
    /// Text written in place of the span.
    pub replacement: String,
}

/// Apply edits to a document and prefix it with its rebuilt doctype declaration.
///
/// The original declaration, if any, is removed from its position and re-rendered at the
/// top; documents without one receive `<!DOCTYPE html>`. A leading byte order mark is
/// dropped. Overlapping or out-of-range edits fail the serialization.
pub fn serialize_document(html: &str, mut edits: Vec<Edit>) -> Result<String, RewriteError> {
    let doctype = match Doctype::find(html) {
        Some((doctype, span)) => {
            edits.push(Edit {
                span,
                replacement: String::new(),
            });
            doctype
        }
        None => Doctype::default(),
    };

    edits.sort_by_key(|edit| edit.span.start);
    let body = splice(html, &edits)?;
    let body = body.trim_start_matches(|ch: char| ch == '\u{feff}' || ch.is_whitespace());
    Ok(format!("{}\n{}", doctype.render(), body))
}

fn splice(html: &str, edits: &[Edit]) -> Result<String, RewriteError> {
    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;

    for edit in edits {
        let Range { start, end } = edit.span;
        if start < cursor || end < start || end > html.len() {
            return Err(RewriteError::Serialize(format!(
                "edit {start}..{end} overlaps a previous edit or exceeds the document"
            )));
        }
        if !html.is_char_boundary(start) || !html.is_char_boundary(end) {
            return Err(RewriteError::Serialize(format!(
                "edit {start}..{end} does not fall on character boundaries"
            )));
        }

        output.push_str(&html[cursor..start]);
        output.push_str(&edit.replacement);
        cursor = end;
    }

    output.push_str(&html[cursor..]);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_edits_and_keeps_existing_doctype() {
        let html = "<!DOCTYPE html>\n<img src=\"a.png\">";
        let output = serialize_document(html, vec![Edit {
            span: 25..32,
            replacement: "\"data:x\"".into(),
        }])
        .unwrap();
        assert_eq!(output, "<!DOCTYPE html>\n<img src=\"data:x\">");
    }

    #[test]
    fn adds_default_doctype_when_missing() {
        let output = serialize_document("<p>hi</p>", Vec::new()).unwrap();
        assert_eq!(output, "<!DOCTYPE html>\n<p>hi</p>");
    }

    #[test]
    fn drops_leading_byte_order_mark() {
        let output = serialize_document("\u{feff}<!DOCTYPE html>\n<html></html>", Vec::new());
        assert_eq!(output.unwrap(), "<!DOCTYPE html>\n<html></html>");

        let output = serialize_document("\u{feff}<p>x</p>", Vec::new()).unwrap();
        assert_eq!(output, "<!DOCTYPE html>\n<p>x</p>");
    }

    #[test]
    fn rejects_overlapping_edits() {
        let edits = vec![
            Edit {
                span: 0..4,
                replacement: "a".into(),
            },
            Edit {
                span: 2..6,
                replacement: "b".into(),
            },
        ];
        let error = serialize_document("<p>hello</p>", edits).unwrap_err();
        assert!(matches!(error, RewriteError::Serialize(_)));
    }

    #[test]
    fn rejects_out_of_range_edits() {
        let edits = vec![Edit {
            span: 5..50,
            replacement: String::new(),
        }];
        assert!(serialize_document("<p>x</p>", edits).is_err());
    }
}
