//! Document parsing: front-matter, body and effective title

use crate::frontmatter::{FrontmatterSplit, split_frontmatter};
use std::path::Path;
use vaultshelf_core::DocumentContent;

/// Split one markdown file into [`DocumentContent`].
///
/// Malformed front-matter never fails the parse: the whole text becomes the
/// body and a warning is recorded on the document.
pub fn parse_document(path: &Path, raw: &str) -> DocumentContent {
    let mut warnings = Vec::new();

    let (frontmatter, body) = match split_frontmatter(raw) {
        FrontmatterSplit::Absent => (None, raw),
        FrontmatterSplit::Present { frontmatter, body } => (Some(frontmatter), body),
        FrontmatterSplit::Malformed { reason } => {
            log::warn!(
                "Malformed front-matter in {}, using whole file as body: {}",
                path.display(),
                reason
            );
            warnings.push(reason);
            (None, raw)
        }
    };

    let title = frontmatter
        .as_ref()
        .and_then(|fm| fm.title())
        .unwrap_or_else(|| title_from_path(path));

    DocumentContent {
        source: path.to_path_buf(),
        title,
        body: body.to_string(),
        frontmatter,
        warnings,
    }
}

/// Title from a file name: `-`/`_` become spaces, each word capitalized.
///
/// ```
/// use std::path::Path;
/// use vaultshelf_parser::title_from_path;
///
/// assert_eq!(title_from_path(Path::new("notes/meeting_notes-2024.md")), "Meeting Notes 2024");
/// assert_eq!(title_from_path(Path::new("API-design.md")), "API Design");
/// ```
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
