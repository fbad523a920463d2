//! # vaultshelf
//!
//! Moves an Obsidian vault into BookStack: top-level folders become books,
//! second-level folders chapters, notes pages, and embedded images and
//! attachments are uploaded and relinked.
//!
//! The binary is a thin shell over [`app::execute`]; the building blocks
//! live in the member crates and are re-exported here.

pub mod app;

pub use app::{Invocation, LogFormat, Outcome, OutputFormat, execute, init_logging};
pub use vaultshelf_core::prelude::*;
pub use vaultshelf_parser::{ReferenceExtractor, parse_document, rewrite_body};
pub use vaultshelf_transfer::{
    BookStackClient, ContentService, RunMode, TransferOrchestrator, TransferReport,
};
pub use vaultshelf_vault::{PathResolver, VaultHierarchy};
