use std::ops::Range;

/// Byte spans of the URL portion of every candidate in a `srcset` value.
///
/// The value is split on commas and each candidate's URL is its first whitespace-separated
/// token; descriptors such as `2x` or `480w` are skipped. `data:` URLs carry commas of their
/// own, so they run until whitespace and only trailing commas end them.
pub fn srcset_url_spans(value: &str) -> Vec<Range<usize>> {
    let bytes = value.as_bytes();
    let mut spans = Vec::new();
    let mut position = 0;

    while position < bytes.len() {
        while position < bytes.len()
            && (bytes[position].is_ascii_whitespace() || bytes[position] == b',')
        {
            position += 1;
        }
        if position >= bytes.len() {
            break;
        }

        let start = position;
        let embeds_commas = is_data_url(&value[start..]);
        while position < bytes.len()
            && !bytes[position].is_ascii_whitespace()
            && (embeds_commas || bytes[position] != b',')
        {
            position += 1;
        }

        let url = value[start..position].trim_end_matches(',');
        if !url.is_empty() {
            spans.push(start..start + url.len());
        }
        position = start + url.len();

        while position < bytes.len() && bytes[position] != b',' {
            position += 1;
        }
    }

    spans
}

fn is_data_url(candidate: &str) -> bool {
    candidate
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}
