//! Walk a real vault on disk, extract references from its notes and
//! resolve them.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vaultshelf_core::prelude::*;
use vaultshelf_parser::{ReferenceExtractor, parse_document};
use vaultshelf_vault::{PathResolver, VaultHierarchy};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_vault() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "Projects/Alpha/plan.md",
        "---\ntitle: Alpha Plan\n---\n\
         ![[local.png]]\n\
         ![Arch](attachments/arch.svg)\n\
         See [[spec.pdf|the spec]].\n\
         ![[nowhere.png]]\n\
         Regular [[Other Note]] link and [site](https://example.com/file.pdf).\n",
    );
    write(root, "Projects/Alpha/local.png", "png");
    write(root, "attachments/arch.svg", "<svg/>");
    write(root, "Files/Docs/spec.pdf", "%PDF");
    write(root, "welcome.md", "# Welcome");
    temp
}

#[test]
fn test_notes_resolve_through_each_strategy() {
    let temp = sample_vault();
    let hierarchy = VaultHierarchy::build(
        temp.path(),
        &VaultSettings::default().excluded_paths,
        "Obsidian Content",
        "Root Files",
    )
    .unwrap();
    let resolver = PathResolver::from_hierarchy(&hierarchy);
    let extractor = ReferenceExtractor::default();

    let (_, node) = hierarchy
        .pages()
        .find(|(_, n)| n.relative == Path::new("Projects/Alpha/plan.md"))
        .unwrap();
    let raw = fs::read_to_string(&node.path).unwrap();
    let doc = parse_document(&node.path, &raw);
    assert_eq!(doc.title, "Alpha Plan");

    let mut references = extractor.extract(&doc.body);
    let unresolved = resolver.resolve_all(&mut references, &node.path);

    let strategies: Vec<(String, ResolutionStrategy)> = references
        .iter()
        .map(|r| (r.declared_path.clone(), r.resolution_strategy))
        .collect();
    assert_eq!(
        strategies,
        vec![
            ("local.png".to_string(), ResolutionStrategy::RelativeToFile),
            (
                "attachments/arch.svg".to_string(),
                ResolutionStrategy::RelativeToVaultRoot
            ),
            ("spec.pdf".to_string(), ResolutionStrategy::VaultWideSearch),
            ("nowhere.png".to_string(), ResolutionStrategy::Unresolved),
        ]
    );
    assert_eq!(unresolved, 1);
    assert_eq!(references[2].asset_kind, AssetKind::Attachment);
}

#[test]
fn test_hierarchy_places_root_notes_first() {
    let temp = sample_vault();
    let hierarchy = VaultHierarchy::build(
        temp.path(),
        &VaultSettings::default().excluded_paths,
        "Obsidian Content",
        "Root Files",
    )
    .unwrap();

    let names: Vec<&str> = hierarchy.targets().iter().map(|t| t.name()).collect();
    assert_eq!(
        names,
        vec!["Obsidian Content", "Root Files", "welcome", "Projects", "Alpha", "plan"]
    );
}
