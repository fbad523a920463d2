//! Locating referenced assets on disk.

use crate::hierarchy::VaultHierarchy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use vaultshelf_core::prelude::*;
use vaultshelf_core::is_within_vault;

/// File name to every vault file carrying it, each list sorted by full path.
#[derive(Debug, Clone, Default)]
pub struct FilenameIndex {
    by_name: HashMap<String, Vec<PathBuf>>,
}

impl FilenameIndex {
    /// Index every file node of a walked vault
    pub fn from_tree(tree: &VaultTree) -> Self {
        let mut by_name: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for (_, node) in tree.iter().filter(|(_, n)| !n.is_dir()) {
            by_name.entry(node.name()).or_default().push(node.path.clone());
        }
        for paths in by_name.values_mut() {
            paths.sort();
        }
        Self { by_name }
    }

    /// Candidates for an exact file name, lexicographically ordered
    pub fn lookup(&self, name: &str) -> &[PathBuf] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct file names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Resolves declared asset paths against the document, the vault root and
/// finally the vault-wide file name index. First hit wins.
#[derive(Debug, Clone)]
pub struct PathResolver {
    vault_root: PathBuf,
    index: FilenameIndex,
}

impl PathResolver {
    pub fn new(vault_root: impl Into<PathBuf>, index: FilenameIndex) -> Self {
        Self {
            vault_root: vault_root.into(),
            index,
        }
    }

    /// Resolver over a hierarchy's walk, indexing it once
    pub fn from_hierarchy(hierarchy: &VaultHierarchy) -> Self {
        let tree = hierarchy.tree();
        Self::new(tree.root(), FilenameIndex::from_tree(tree))
    }

    pub fn vault_root(&self) -> &Path {
        &self.vault_root
    }

    /// Fill in `resolved_path`, `resolution_strategy` and, for ambiguous
    /// name matches, `alternatives`. Returns the strategy that matched.
    pub fn resolve(&self, reference: &mut AssetReference, document: &Path) -> ResolutionStrategy {
        let declared = Path::new(reference.declared_path.trim());
        reference.alternatives.clear();

        if declared.as_os_str().is_empty() {
            reference.resolved_path = None;
            reference.resolution_strategy = ResolutionStrategy::Unresolved;
            return ResolutionStrategy::Unresolved;
        }

        let relative_to_file = document.parent().map(|dir| dir.join(declared));
        let relative_to_root = self.vault_root.join(strip_root(declared));

        let (path, strategy) = if let Some(path) = relative_to_file.filter(|p| self.accepts(p)) {
            (Some(path), ResolutionStrategy::RelativeToFile)
        } else if self.accepts(&relative_to_root) {
            (Some(relative_to_root), ResolutionStrategy::RelativeToVaultRoot)
        } else if let Some((first, rest)) = declared
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| self.index.lookup(name).split_first())
        {
            if !rest.is_empty() {
                log::info!(
                    "Ambiguous reference {} in {}: using {}, {} other match(es)",
                    reference.declared_path,
                    document.display(),
                    first.display(),
                    rest.len()
                );
                reference.alternatives = rest.to_vec();
            }
            (Some(first.clone()), ResolutionStrategy::VaultWideSearch)
        } else {
            (None, ResolutionStrategy::Unresolved)
        };

        if path.is_none() {
            log::debug!(
                "Unresolved reference {} in {}",
                reference.declared_path,
                document.display()
            );
        }
        reference.resolved_path = path;
        reference.resolution_strategy = strategy;
        strategy
    }

    /// Resolve every reference of one document; returns how many stayed
    /// unresolved.
    pub fn resolve_all(&self, references: &mut [AssetReference], document: &Path) -> usize {
        references
            .iter_mut()
            .map(|r| self.resolve(r, document))
            .filter(|s| *s == ResolutionStrategy::Unresolved)
            .count()
    }

    fn accepts(&self, candidate: &Path) -> bool {
        if !candidate.is_file() {
            return false;
        }
        if !is_within_vault(&self.vault_root, candidate) {
            log::warn!(
                "Ignoring {}: resolves outside the vault",
                candidate.display()
            );
            return false;
        }
        true
    }
}

/// `/img/a.png` written in a note means vault-root relative
fn strip_root(declared: &Path) -> &Path {
    declared.strip_prefix("/").unwrap_or(declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vault(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "x").unwrap();
        }
        dir
    }

    fn resolver(dir: &TempDir) -> PathResolver {
        let hierarchy = VaultHierarchy::build(
            dir.path(),
            &VaultSettings::default().excluded_paths,
            "Shelf",
            "Root Files",
        )
        .unwrap();
        PathResolver::from_hierarchy(&hierarchy)
    }

    fn image(declared: &str) -> AssetReference {
        AssetReference::new(
            format!("![[{declared}]]"),
            SyntaxKind::ObsidianEmbed,
            AssetKind::Image,
            declared,
            0,
        )
    }

    #[test]
    fn test_relative_to_file_wins() {
        let dir = vault(&["Notes/page.md", "Notes/pic.png", "pic.png", "Other/pic.png"]);
        let resolver = resolver(&dir);
        let mut reference = image("pic.png");

        let strategy = resolver.resolve(&mut reference, &dir.path().join("Notes/page.md"));
        assert_eq!(strategy, ResolutionStrategy::RelativeToFile);
        assert_eq!(reference.resolved_path, Some(dir.path().join("Notes/pic.png")));
        assert!(reference.alternatives.is_empty());
    }

    #[test]
    fn test_vault_root_before_search() {
        let dir = vault(&["Notes/page.md", "assets/pic.png", "Other/assets/pic.png"]);
        let resolver = resolver(&dir);
        let mut reference = image("assets/pic.png");

        let strategy = resolver.resolve(&mut reference, &dir.path().join("Notes/page.md"));
        assert_eq!(strategy, ResolutionStrategy::RelativeToVaultRoot);
        assert_eq!(reference.resolved_path, Some(dir.path().join("assets/pic.png")));
    }

    #[test]
    fn test_leading_slash_is_vault_root() {
        let dir = vault(&["Notes/page.md", "assets/pic.png"]);
        let resolver = resolver(&dir);
        let mut reference = image("/assets/pic.png");

        resolver.resolve(&mut reference, &dir.path().join("Notes/page.md"));
        assert_eq!(
            reference.resolution_strategy,
            ResolutionStrategy::RelativeToVaultRoot
        );
    }

    #[test]
    fn test_vault_wide_search_strips_directories() {
        let dir = vault(&["Notes/page.md", "Attachments/2024/diagram.png"]);
        let resolver = resolver(&dir);
        let mut reference = image("wrong/dir/diagram.png");

        let strategy = resolver.resolve(&mut reference, &dir.path().join("Notes/page.md"));
        assert_eq!(strategy, ResolutionStrategy::VaultWideSearch);
        assert_eq!(
            reference.resolved_path,
            Some(dir.path().join("Attachments/2024/diagram.png"))
        );
    }

    #[test]
    fn test_ambiguous_search_is_lexicographic() {
        let dir = vault(&["page.md", "b/shot.png", "a/shot.png", "c/shot.png"]);
        let resolver = resolver(&dir);
        let mut reference = image("shot.png");

        // page.md sits at the root, so strategies 1 and 2 miss
        let strategy = resolver.resolve(&mut reference, &dir.path().join("page.md"));
        assert_eq!(strategy, ResolutionStrategy::VaultWideSearch);
        assert_eq!(reference.resolved_path, Some(dir.path().join("a/shot.png")));
        assert_eq!(
            reference.alternatives,
            vec![dir.path().join("b/shot.png"), dir.path().join("c/shot.png")]
        );
    }

    #[test]
    fn test_unresolved() {
        let dir = vault(&["page.md"]);
        let resolver = resolver(&dir);
        let mut references = vec![image("missing.png"), image("")];

        let unresolved = resolver.resolve_all(&mut references, &dir.path().join("page.md"));
        assert_eq!(unresolved, 2);
        assert!(references.iter().all(|r| !r.is_resolved()));
    }

    #[test]
    fn test_escape_outside_vault_rejected() {
        let outer = TempDir::new().unwrap();
        let vault_dir = outer.path().join("vault");
        fs::create_dir_all(vault_dir.join("Notes")).unwrap();
        fs::write(vault_dir.join("Notes/page.md"), "x").unwrap();
        fs::write(outer.path().join("secret.png"), "x").unwrap();

        let hierarchy =
            VaultHierarchy::build(&vault_dir, &Default::default(), "Shelf", "Root").unwrap();
        let resolver = PathResolver::from_hierarchy(&hierarchy);
        let mut reference = image("../../secret.png");

        resolver.resolve(&mut reference, &vault_dir.join("Notes/page.md"));
        assert!(!reference.is_resolved());
    }

    #[test]
    fn test_directories_not_indexed() {
        let dir = vault(&["page.md", "pic.png/inner.md"]);
        let hierarchy =
            VaultHierarchy::build(dir.path(), &Default::default(), "Shelf", "Root").unwrap();
        let index = FilenameIndex::from_tree(hierarchy.tree());

        assert!(index.lookup("pic.png").is_empty());
        assert_eq!(index.lookup("inner.md").len(), 1);
        assert_eq!(index.len(), 2);
    }
}
