//! Core data models shared by every stage of a transfer.
//!
//! These types are designed to be:
//! - **Serializable**: report-facing types derive Serialize/Deserialize
//! - **Arena-friendly**: vault nodes and hierarchy targets refer to each
//!   other through plain indices ([`NodeId`], [`TargetId`]), never owning
//! - **Type-Safe**: enums replace magic strings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a node inside a [`VaultTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Index of a target inside a hierarchy's target list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub usize);

/// Whether a vault entry is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
}

/// A file or directory discovered by the vault walk.
///
/// `depth` counts the directories between the vault root and the node,
/// including the node itself when it is a directory: `note.md` at the root
/// is 0, directory `A` is 1, `A/note.md` is 1, `A/B` is 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultNode {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub kind: NodeKind,
    pub depth: usize,
    pub parent: Option<NodeId>,
}

impl VaultNode {
    /// File or directory name as a string (lossy)
    pub fn name(&self) -> String {
        self.relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its extension
    pub fn stem(&self) -> String {
        self.relative
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Markdown documents are files with an `md` extension (any case)
    pub fn is_markdown(&self) -> bool {
        self.kind == NodeKind::File
            && self
                .path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("md"))
    }
}

/// Arena holding every node of one vault walk.
///
/// Nodes are pushed in walk order and never removed, so a [`NodeId`] stays
/// valid for the lifetime of the tree and orders nodes by discovery.
#[derive(Debug, Clone)]
pub struct VaultTree {
    root: PathBuf,
    nodes: Vec<VaultNode>,
}

impl VaultTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            nodes: Vec::new(),
        }
    }

    /// Vault root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append a node and return its id
    pub fn push(&mut self, node: VaultNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&VaultNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes with their ids in walk order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &VaultNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Walk from a node up to the vault root (the node itself excluded)
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &VaultNode)> {
        let mut current = self.get(id).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let next = current?;
            let node = self.get(next)?;
            current = node.parent;
            Some((next, node))
        })
    }
}

/// Which container a page is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentTarget {
    Book(TargetId),
    Chapter(TargetId),
}

/// One entry of the four-level destination hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyTarget {
    /// The single shelf every book is placed on
    Shelf { name: String },
    /// A depth-1 directory, or the synthetic root-files book (`source: None`)
    Book { name: String, source: Option<NodeId> },
    /// A depth-2 directory inside a book
    Chapter {
        name: String,
        book: TargetId,
        source: NodeId,
    },
    /// A markdown document
    Page {
        name: String,
        node: NodeId,
        parent: ParentTarget,
    },
}

impl HierarchyTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Shelf { name }
            | Self::Book { name, .. }
            | Self::Chapter { name, .. }
            | Self::Page { name, .. } => name,
        }
    }

    pub fn level(&self) -> HierarchyLevel {
        match self {
            Self::Shelf { .. } => HierarchyLevel::Shelf,
            Self::Book { .. } => HierarchyLevel::Book,
            Self::Chapter { .. } => HierarchyLevel::Chapter,
            Self::Page { .. } => HierarchyLevel::Page,
        }
    }
}

/// Level of a [`HierarchyTarget`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Shelf,
    Book,
    Chapter,
    Page,
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Shelf => "shelf",
            Self::Book => "book",
            Self::Chapter => "chapter",
            Self::Page => "page",
        };
        f.write_str(s)
    }
}

/// Parsed YAML front-matter, as a string-keyed map of JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub data: HashMap<String, serde_json::Value>,
}

impl Frontmatter {
    /// Non-empty `title` field, if any. Numbers and booleans are taken
    /// as written (`title: 2024`).
    pub fn title(&self) -> Option<String> {
        let title = match self.data.get("title")? {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!title.is_empty()).then_some(title)
    }
}

/// A markdown document split into metadata and body
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContent {
    pub source: PathBuf,
    pub title: String,
    pub body: String,
    pub frontmatter: Option<Frontmatter>,
    /// Recoverable problems met while parsing (malformed front-matter)
    pub warnings: Vec<String>,
}

/// Markup family an asset reference was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyntaxKind {
    /// `![[file]]`, or `[[file.pdf]]` for attachments
    ObsidianEmbed,
    /// `![alt](path)`
    MarkdownImage,
    /// `[label](path.pdf)`
    MarkdownLink,
}

/// What the referenced file is uploaded as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Attachment,
}

/// Rule that located an asset on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    RelativeToFile,
    RelativeToVaultRoot,
    VaultWideSearch,
    Unresolved,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RelativeToFile => "relative-to-file",
            Self::RelativeToVaultRoot => "relative-to-vault-root",
            Self::VaultWideSearch => "vault-wide-search",
            Self::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

/// An embedded image or attachment found in a document body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Exact substring of the body to replace
    pub raw_markup: String,
    pub syntax_kind: SyntaxKind,
    pub asset_kind: AssetKind,
    /// Path as written in the document, alias and fragment stripped
    pub declared_path: String,
    /// Alt text, link text or wikilink alias
    pub label: Option<String>,
    /// Byte offset of `raw_markup` in the body
    pub offset: usize,
    pub resolved_path: Option<PathBuf>,
    pub resolution_strategy: ResolutionStrategy,
    /// Other vault-wide candidates passed over on an ambiguous match
    pub alternatives: Vec<PathBuf>,
}

impl AssetReference {
    pub fn new(
        raw_markup: impl Into<String>,
        syntax_kind: SyntaxKind,
        asset_kind: AssetKind,
        declared_path: impl Into<String>,
        offset: usize,
    ) -> Self {
        Self {
            raw_markup: raw_markup.into(),
            syntax_kind,
            asset_kind,
            declared_path: declared_path.into(),
            label: None,
            offset,
            resolved_path: None,
            resolution_strategy: ResolutionStrategy::Unresolved,
            alternatives: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.is_empty()).then_some(label);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }

    /// Text used for the rewritten link: the label, else the file stem
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        Path::new(&self.declared_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Terminal status of one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStatus {
    Succeeded,
    FailedPermanently,
}

/// Result of uploading the file behind one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Index of the reference within its document's reference list
    pub reference: usize,
    pub attempt_count: u32,
    pub final_status: UploadStatus,
    pub remote_id: Option<u64>,
    pub remote_url: Option<String>,
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(reference: usize, attempt_count: u32, id: u64, url: impl Into<String>) -> Self {
        Self {
            reference,
            attempt_count,
            final_status: UploadStatus::Succeeded,
            remote_id: Some(id),
            remote_url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(reference: usize, attempt_count: u32, error: impl Into<String>) -> Self {
        Self {
            reference,
            attempt_count,
            final_status: UploadStatus::FailedPermanently,
            remote_id: None,
            remote_url: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.final_status == UploadStatus::Succeeded
    }
}
