use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Decode the character references inside an attribute value.
///
/// Named references use the full HTML5 table and numeric references are decoded as well.
/// Stray ampersands and unknown names are kept verbatim, the way browsers treat them.
pub fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    if let Ok(decoded) = unescape_with(value, resolve_html5_entity) {
        return decoded;
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let reference = candidate.find(';').map(|end| &candidate[..=end]);
        let replacement = reference
            .and_then(|reference| unescape_with(reference, resolve_html5_entity).ok());
        match reference.zip(replacement) {
            Some((reference, replacement)) => {
                decoded.push_str(&replacement);
                rest = &candidate[reference.len()..];
            }
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

/// Render a value as a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('"');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(decode_entities("a.css?x=1&amp;y=2"), "a.css?x=1&y=2");
        assert_eq!(decode_entities("my&#32;file&#x2E;png"), "my file.png");
    }

    #[test]
    fn decodes_html5_named_references() {
        assert_eq!(decode_entities("caf&eacute;.png"), "café.png");
        assert_eq!(decode_entities("&copy;2024&hellip;"), "©2024…");
    }

    #[test]
    fn keeps_unknown_references_verbatim() {
        assert_eq!(decode_entities("a&copy;b & c"), "a©b & c");
        assert_eq!(decode_entities("a&bogus;b&amp;c"), "a&bogus;b&c");
    }

    #[test]
    fn escapes_quotes_and_ampersands() {
        assert_eq!(escape_attribute("a\"b&c"), "\"a&quot;b&amp;c\"");
    }
}
