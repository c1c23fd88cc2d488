/// Normalise an upload-relative path into its canonical forward-slash form.
///
/// Backslashes are treated as separators, empty and `.` segments are dropped and `..` pops
/// the previous segment. Parent segments that would climb above the upload root are
/// discarded, and the result never carries a leading slash.
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    push_segments(&mut segments, &unified);
    segments.join("/")
}

/// Directory portion of a normalised path, or an empty string for top-level files.
pub fn directory_of(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(index) => normalized[..index].to_string(),
        None => String::new(),
    }
}

/// Lowercased final segment of a path, used as the key of the basename fallback index.
pub fn basename_key(path: &str) -> String {
    let normalized = normalize_path(path);
    normalized
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resolve a reference found in a document against the document's directory.
///
/// References starting with `/` are rooted at the upload root; everything else is resolved
/// relative to `base_dir` segment by segment.
pub fn resolve_reference(base_dir: &str, reference: &str) -> String {
    let unified = reference.replace('\\', "/");
    if let Some(rooted) = unified.strip_prefix('/') {
        return normalize_path(rooted);
    }

    let mut segments: Vec<&str> = Vec::new();
    push_segments(&mut segments, base_dir);
    push_segments(&mut segments, &unified);
    segments.join("/")
}

fn push_segments<'a>(stack: &mut Vec<&'a str>, path: &'a str) {
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            segment => stack.push(segment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_dot_segments_and_separators() {
        assert_eq!(normalize_path("./site//img/./a.png"), "site/img/a.png");
        assert_eq!(normalize_path("site\\css\\..\\img\\a.png"), "site/img/a.png");
        assert_eq!(normalize_path("/rooted/file.css"), "rooted/file.css");
    }

    #[test]
    fn never_climbs_above_the_root() {
        assert_eq!(normalize_path("../../a.css"), "a.css");
        assert_eq!(normalize_path(".."), "");
    }

    #[test]
    fn directory_of_top_level_file_is_empty() {
        assert_eq!(directory_of("index.html"), "");
        assert_eq!(directory_of("site/pages/index.html"), "site/pages");
    }

    #[test]
    fn basename_key_is_lowercased() {
        assert_eq!(basename_key("Old/Images/LOGO.PNG"), "logo.png");
        assert_eq!(basename_key("logo.png"), "logo.png");
    }

    #[test]
    fn resolves_relative_to_document_directory() {
        assert_eq!(resolve_reference("site", "img/photo.png"), "site/img/photo.png");
        assert_eq!(
            resolve_reference("pages/sub", "../shared/style.css"),
            "pages/shared/style.css"
        );
        assert_eq!(resolve_reference("", "./a/b.js"), "a/b.js");
    }

    #[test]
    fn rooted_references_ignore_document_directory() {
        assert_eq!(resolve_reference("site/pages", "/css/main.css"), "css/main.css");
    }
}
