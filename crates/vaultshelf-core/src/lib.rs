//! # vaultshelf core
//!
//! Core data models, error types, configuration and retry policy for moving
//! an Obsidian vault into a shelf/book/chapter/page content service.
//! This crate defines the canonical types that all other crates depend on.
//!
//! ## Core Modules
//!
//! - [`models`] - Vault tree, hierarchy targets, asset references, upload outcomes
//! - [`error`] - Local [`Error`] and remote [`RemoteError`] types
//! - [`config`] - [`TransferConfig`] loading and validation
//! - [`resilience`] - Fixed pacing and rate-limit backoff for remote calls
//! - [`utils`] - Serialization and path containment helpers
//!
//! ## Usage Examples
//!
//! ```
//! use vaultshelf_core::prelude::*;
//!
//! let reference = AssetReference::new(
//!     "![[diagram.png]]",
//!     SyntaxKind::ObsidianEmbed,
//!     AssetKind::Image,
//!     "diagram.png",
//!     0,
//! );
//! assert_eq!(reference.resolution_strategy, ResolutionStrategy::Unresolved);
//! assert_eq!(reference.display_label(), "diagram");
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod resilience;
pub mod utils;

pub use crate::config::*;
pub use error::{Error, RemoteError, Result};
pub use models::*;
pub use resilience::{Attempted, RetryPolicy, paced_retry};
pub use utils::{is_within_vault, normalize_path, to_json_string};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{RemoteSettings, TransferConfig, TransferSettings, VaultSettings};
    pub use crate::error::{Error, RemoteError, Result};
    pub use crate::models::{
        AssetKind, AssetReference, DocumentContent, Frontmatter, HierarchyLevel,
        HierarchyTarget, NodeId, NodeKind, ParentTarget, ResolutionStrategy, SyntaxKind,
        TargetId, UploadOutcome, UploadStatus, VaultNode, VaultTree,
    };
    pub use crate::resilience::{Attempted, RetryPolicy, paced_retry};
}
