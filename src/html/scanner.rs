use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::entities::decode_entities;

/// Elements whose content is raw text and must not be scanned for markup.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<![^>]*>|<\?[^>]*>|</[^>]*>|<([A-Za-z][A-Za-z0-9:\-]*)((?:\s+|/|[^\s/>=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)?)?)*)>"#,
        )
        .expect("invalid markup regex")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([^\s/>=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))?)?"#)
            .expect("invalid attribute regex")
    })
}

/// Attribute of a scanned start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name.
    pub name: String,
    /// Decoded value, `None` for attributes written without a value.
    pub value: Option<String>,
    /// Byte span of the value token in the document, including any quotes.
    pub value_span: Range<usize>,
}

/// Start tag found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lowercased element name.
    pub name: String,
    /// Attributes in source order. Repeated names keep their first occurrence only.
    pub attributes: Vec<Attribute>,
    /// Byte span of the whole tag.
    pub span: Range<usize>,
}

impl StartTag {
    /// Look up an attribute by (case-insensitive) name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self
            .attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }

    /// Whether the whitespace-separated `rel` attribute contains `token`.
    pub fn has_rel_token(&self, token: &str) -> bool {
        self
            .attribute("rel")
            .and_then(|attribute| attribute.value.as_deref())
            .is_some_and(|rel| {
                rel
                    .split_ascii_whitespace()
                    .any(|candidate| candidate.eq_ignore_ascii_case(token))
            })
    }
}

/// Collect every start tag in document order.
///
/// Comments, declarations, end tags and the content of raw-text elements such as
/// `<script>` and `<style>` are skipped. An empty result means the text carries no markup.
pub fn scan_start_tags(html: &str) -> Vec<StartTag> {
    let lowered = html.to_ascii_lowercase();
    let mut tags = Vec::new();
    let mut position = 0;

    while position < html.len() {
        let Some(captures) = markup_pattern().captures_at(html, position) else {
            break;
        };
        let Some(whole) = captures.get(0) else {
            break;
        };
        position = whole.end().max(whole.start() + 1);

        let Some(name) = captures.get(1) else {
            continue;
        };
        let attributes_offset = captures.get(2).map(|m| m.start()).unwrap_or(whole.end());
        let attributes_source = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

        let tag = StartTag {
            name: name.as_str().to_ascii_lowercase(),
            attributes: scan_attributes(attributes_source, attributes_offset),
            span: whole.range(),
        };

        let self_closing = attributes_source.trim_end().ends_with('/');
        if !self_closing && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
            let closing = format!("</{}", tag.name);
            position = match lowered[position..].find(&closing) {
                Some(offset) => position + offset,
                None => html.len(),
            };
        }

        tags.push(tag);
    }

    tags
}

fn scan_attributes(source: &str, offset: usize) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = Vec::new();

    for captures in attribute_pattern().captures_iter(source) {
        let Some(name) = captures.get(1) else {
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        if attributes.iter().any(|existing| existing.name == name) {
            continue;
        }

        let quoted = captures.get(2).or_else(|| captures.get(3));
        let (value, value_span) = if let Some(quoted) = quoted {
            (
                Some(decode_entities(quoted.as_str()).into_owned()),
                offset + quoted.start() - 1..offset + quoted.end() + 1,
            )
        } else if let Some(bare) = captures.get(4) {
            (
                Some(decode_entities(bare.as_str()).into_owned()),
                offset + bare.start()..offset + bare.end(),
            )
        } else {
            let end = offset + captures.get(0).map(|m| m.end()).unwrap_or_default();
            (None, end..end)
        };

        attributes.push(Attribute {
            name,
            value,
            value_span,
        });
    }

    attributes
}
