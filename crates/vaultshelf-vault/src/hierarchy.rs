//! Single-pass vault walk and classification into shelf, books, chapters
//! and pages.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;
use vaultshelf_core::prelude::*;
use walkdir::WalkDir;

/// Number of targets at each level of a hierarchy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HierarchyCounts {
    pub shelves: usize,
    pub books: usize,
    pub chapters: usize,
    pub pages: usize,
}

/// A walked vault and the targets it maps to.
///
/// Targets are stored in transfer order: the shelf first, then each book
/// followed by its direct pages, then each of its chapters followed by the
/// chapter's pages. Every target appears after the target it belongs to.
#[derive(Debug, Clone)]
pub struct VaultHierarchy {
    tree: VaultTree,
    targets: Vec<HierarchyTarget>,
}

#[derive(Debug, Default)]
struct BookPlan {
    pages: Vec<NodeId>,
    chapters: BTreeMap<NodeId, Vec<NodeId>>,
}

impl VaultHierarchy {
    /// Build the hierarchy for the vault described by `config`
    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        Self::build(
            &config.vault.path,
            &config.vault.excluded_paths,
            &config.transfer.shelf_name,
            &config.transfer.root_book_name,
        )
    }

    /// Walk `root` once and classify every markdown file.
    ///
    /// Fails with [`Error::VaultEmpty`] when the root is not a directory or
    /// holds no markdown file anywhere below it.
    #[instrument(skip(excluded), name = "hierarchy_build")]
    pub fn build(
        root: &Path,
        excluded: &BTreeSet<String>,
        shelf_name: &str,
        root_book_name: &str,
    ) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::vault_empty(root));
        }

        let tree = walk(root, excluded)?;
        let markdown = tree.iter().filter(|(_, n)| n.is_markdown()).count();
        if markdown == 0 {
            return Err(Error::vault_empty(root));
        }
        log::info!(
            "Walked {}: {} entries, {} markdown files",
            root.display(),
            tree.len(),
            markdown
        );

        let targets = classify(&tree, shelf_name, root_book_name);
        let hierarchy = Self { tree, targets };

        let counts = hierarchy.counts();
        log::debug!(
            "Hierarchy: {} books, {} chapters, {} pages",
            counts.books,
            counts.chapters,
            counts.pages
        );
        Ok(hierarchy)
    }

    pub fn tree(&self) -> &VaultTree {
        &self.tree
    }

    pub fn targets(&self) -> &[HierarchyTarget] {
        &self.targets
    }

    pub fn get(&self, id: TargetId) -> Option<&HierarchyTarget> {
        self.targets.get(id.0)
    }

    /// Targets with their ids, in transfer order
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &HierarchyTarget)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(i, t)| (TargetId(i), t))
    }

    /// The shelf is always the first target
    pub fn shelf(&self) -> TargetId {
        TargetId(0)
    }

    /// Target that `id` belongs to; `None` for the shelf
    pub fn parent_of(&self, id: TargetId) -> Option<TargetId> {
        match self.get(id)? {
            HierarchyTarget::Shelf { .. } => None,
            HierarchyTarget::Book { .. } => Some(self.shelf()),
            HierarchyTarget::Chapter { book, .. } => Some(*book),
            HierarchyTarget::Page { parent, .. } => match parent {
                ParentTarget::Book(t) | ParentTarget::Chapter(t) => Some(*t),
            },
        }
    }

    /// Direct children of a target, in transfer order
    pub fn children_of(&self, id: TargetId) -> impl Iterator<Item = (TargetId, &HierarchyTarget)> {
        self.iter()
            .filter(move |(child, _)| self.parent_of(*child) == Some(id))
    }

    /// Vault node a book, chapter or page was built from
    pub fn source_node(&self, id: TargetId) -> Option<&VaultNode> {
        let node = match self.get(id)? {
            HierarchyTarget::Shelf { .. } => None,
            HierarchyTarget::Book { source, .. } => *source,
            HierarchyTarget::Chapter { source, .. } => Some(*source),
            HierarchyTarget::Page { node, .. } => Some(*node),
        }?;
        self.tree.get(node)
    }

    /// Page targets with their source documents
    pub fn pages(&self) -> impl Iterator<Item = (TargetId, &VaultNode)> {
        self.iter().filter_map(|(id, target)| match target {
            HierarchyTarget::Page { node, .. } => self.tree.get(*node).map(|n| (id, n)),
            _ => None,
        })
    }

    pub fn counts(&self) -> HierarchyCounts {
        let mut counts = HierarchyCounts::default();
        for target in &self.targets {
            match target.level() {
                HierarchyLevel::Shelf => counts.shelves += 1,
                HierarchyLevel::Book => counts.books += 1,
                HierarchyLevel::Chapter => counts.chapters += 1,
                HierarchyLevel::Page => counts.pages += 1,
            }
        }
        counts
    }
}

fn is_excluded(name: &OsStr, excluded: &BTreeSet<String>) -> bool {
    name.to_str().is_some_and(|n| excluded.contains(n))
}

fn walk(root: &Path, excluded: &BTreeSet<String>) -> Result<VaultTree> {
    let mut tree = VaultTree::new(root);
    let mut directories: HashMap<PathBuf, NodeId> = HashMap::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry.file_name(), excluded));

    for entry in walker {
        let entry = entry.map_err(|e| Error::io(io::Error::from(e)))?;
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_path_buf();

        let kind = if entry.file_type().is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        let components = relative.components().count();
        let depth = match kind {
            NodeKind::Directory => components,
            NodeKind::File => components.saturating_sub(1),
        };
        let parent = relative
            .parent()
            .and_then(|p| directories.get(p).copied());

        let id = tree.push(VaultNode {
            path: entry.path().to_path_buf(),
            relative: relative.clone(),
            kind,
            depth,
            parent,
        });
        if kind == NodeKind::Directory {
            directories.insert(relative, id);
        }
    }

    Ok(tree)
}

fn classify(tree: &VaultTree, shelf_name: &str, root_book_name: &str) -> Vec<HierarchyTarget> {
    let mut root_pages = Vec::new();
    let mut books: BTreeMap<NodeId, BookPlan> = BTreeMap::new();

    for (id, _) in tree.iter().filter(|(_, n)| n.is_markdown()) {
        let mut book = None;
        let mut chapter = None;
        for (ancestor, node) in tree.ancestors(id) {
            match node.depth {
                1 => book = Some(ancestor),
                2 => chapter = Some(ancestor),
                _ => {}
            }
        }

        match (book, chapter) {
            (Some(book), Some(chapter)) => books
                .entry(book)
                .or_default()
                .chapters
                .entry(chapter)
                .or_default()
                .push(id),
            (Some(book), None) => books.entry(book).or_default().pages.push(id),
            (None, _) => root_pages.push(id),
        }
    }

    let skipped = tree
        .iter()
        .filter(|(id, n)| n.is_dir() && n.depth == 1 && !books.contains_key(id))
        .count();
    if skipped > 0 {
        log::debug!("Skipping {} top-level directories without markdown", skipped);
    }

    let mut targets = vec![HierarchyTarget::Shelf {
        name: shelf_name.to_string(),
    }];
    let push_pages = |targets: &mut Vec<HierarchyTarget>, pages: Vec<NodeId>, parent: ParentTarget| {
        for node in pages {
            let name = tree.get(node).map(VaultNode::stem).unwrap_or_default();
            targets.push(HierarchyTarget::Page { name, node, parent });
        }
    };

    if !root_pages.is_empty() {
        let book = TargetId(targets.len());
        targets.push(HierarchyTarget::Book {
            name: root_book_name.to_string(),
            source: None,
        });
        push_pages(&mut targets, root_pages, ParentTarget::Book(book));
    }

    for (book_node, plan) in books {
        let book = TargetId(targets.len());
        targets.push(HierarchyTarget::Book {
            name: tree.get(book_node).map(VaultNode::name).unwrap_or_default(),
            source: Some(book_node),
        });
        push_pages(&mut targets, plan.pages, ParentTarget::Book(book));

        for (chapter_node, pages) in plan.chapters {
            let chapter = TargetId(targets.len());
            targets.push(HierarchyTarget::Chapter {
                name: tree
                    .get(chapter_node)
                    .map(VaultNode::name)
                    .unwrap_or_default(),
                book,
                source: chapter_node,
            });
            push_pages(&mut targets, pages, ParentTarget::Chapter(chapter));
        }
    }

    targets
}
