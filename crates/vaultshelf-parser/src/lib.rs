//! # vaultshelf parser
//!
//! Text-level processing of Obsidian markdown documents:
//!
//! - [`document`] - split a file into front-matter and body, derive its title
//! - [`assets`] - find embedded images and attachments in a body
//! - [`rewrite`] - point those references at uploaded copies
//!
//! ## Quick Start
//!
//! ```
//! use std::path::Path;
//! use vaultshelf_parser::{ReferenceExtractor, Replacement, parse_document, rewrite_body};
//!
//! let doc = parse_document(
//!     Path::new("vault/trip-report.md"),
//!     "---\ntags: [travel]\n---\nLook: ![[beach.jpg]]",
//! );
//! assert_eq!(doc.title, "Trip Report");
//!
//! let refs = ReferenceExtractor::default().extract(&doc.body);
//! assert_eq!(refs.len(), 1);
//!
//! let body = rewrite_body(
//!     &doc.body,
//!     &[Replacement { reference: &refs[0], url: "https://docs.example.com/img/1.jpg" }],
//! );
//! assert_eq!(body, "Look: ![beach](https://docs.example.com/img/1.jpg)");
//! ```

pub mod assets;
pub mod document;
pub mod frontmatter;
pub mod rewrite;

pub use assets::ReferenceExtractor;
pub use document::{parse_document, title_from_path};
pub use frontmatter::{FrontmatterSplit, parse_frontmatter, split_frontmatter};
pub use rewrite::{Replacement, rewrite_body};
