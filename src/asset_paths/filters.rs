use regex::Regex;

fn external_reference_patterns() -> &'static [Regex] {
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("invalid scheme regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
                Regex::new(r"^#").expect("invalid anchor regex"),
            ]
        })
        .as_slice()
}

/// Determine whether a reference points outside the uploaded files.
///
/// Absolute URLs with a scheme (including `data:` and `blob:`), protocol-relative URLs and
/// pure in-page anchors are left untouched by the rewriter and never reported as missing.
pub fn is_external_reference(value: &str) -> bool {
    external_reference_patterns()
        .iter()
        .any(|pattern| pattern.is_match(value))
}

/// Drop any query string or fragment from a reference before it is resolved.
pub fn strip_query_and_fragment(value: &str) -> &str {
    match value.find(['?', '#']) {
        Some(index) => &value[..index],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treats_scheme_urls_as_external() {
        assert!(is_external_reference("https://example.com/a.css"));
        assert!(is_external_reference("HTTP://example.com"));
        assert!(is_external_reference("data:image/png;base64,abc"));
        assert!(is_external_reference("blob:null/1234"));
        assert!(is_external_reference("mailto:user@example.com"));
    }

    #[test]
    fn treats_protocol_relative_and_anchors_as_external() {
        assert!(is_external_reference("//cdn.example.com/lib.js"));
        assert!(is_external_reference("#section"));
    }

    #[test]
    fn keeps_relative_paths() {
        assert!(!is_external_reference("images/photo.png"));
        assert!(!is_external_reference("../style.css"));
        assert!(!is_external_reference("/rooted.js"));
    }

    #[test]
    fn strips_query_and_fragment_suffixes() {
        assert_eq!(strip_query_and_fragment("a.css?v=2"), "a.css");
        assert_eq!(strip_query_and_fragment("sprite.svg#icon"), "sprite.svg");
        assert_eq!(strip_query_and_fragment("plain.js"), "plain.js");
    }
}
