//! # vaultshelf vault
//!
//! Filesystem side of a transfer: one deterministic walk of the vault
//! classified into a shelf/book/chapter/page [`VaultHierarchy`], and a
//! [`PathResolver`] that locates the files notes embed.
//!
//! ```no_run
//! use std::path::Path;
//! use vaultshelf_core::VaultSettings;
//! use vaultshelf_vault::{PathResolver, VaultHierarchy};
//!
//! let settings = VaultSettings::default();
//! let hierarchy = VaultHierarchy::build(
//!     Path::new("/home/me/vault"),
//!     &settings.excluded_paths,
//!     "Obsidian Content",
//!     "Root Files",
//! )?;
//! let resolver = PathResolver::from_hierarchy(&hierarchy);
//! println!("{} pages", hierarchy.counts().pages);
//! # let _ = resolver;
//! # Ok::<(), vaultshelf_core::Error>(())
//! ```

pub mod hierarchy;
pub mod resolver;

pub use hierarchy::{HierarchyCounts, VaultHierarchy};
pub use resolver::{FilenameIndex, PathResolver};
