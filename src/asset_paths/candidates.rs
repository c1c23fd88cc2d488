use std::collections::BTreeSet;

use super::normalize::{normalize_path, resolve_reference};

/// Generate the exact-path lookup candidates for a reference found in a document.
///
/// Candidates are produced in priority order: the reference resolved against the
/// document directory, the same path with a leading `./` removed, and finally the raw
/// value normalised as if it were rooted at the upload root. Duplicates and empty
/// candidates are dropped so the first hit is always the highest-priority one.
pub fn lookup_candidates(base_dir: &str, reference: &str) -> Vec<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Vec::new();
    }

    let mut builder = CandidateBuilder::default();
    let resolved = resolve_reference(base_dir, reference);
    let stripped = resolved
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or_else(|| resolved.clone());

    builder.push(resolved);
    builder.push(stripped);
    builder.push(normalize_path(reference));

    builder.finish()
}

#[derive(Default)]
struct CandidateBuilder {
    seen: BTreeSet<String>,
    result: Vec<String>,
}

impl CandidateBuilder {
    fn push(&mut self, candidate: String) {
        if candidate.is_empty() {
            return;
        }
        if self.seen.insert(candidate.clone()) {
            self.result.push(candidate);
        }
    }

    fn finish(self) -> Vec<String> {
        self.result
    }
}
