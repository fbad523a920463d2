//! Frontmatter extraction: ---\nYAML\n---

use regex::Regex;
use std::sync::LazyLock;
use vaultshelf_core::{Error, Frontmatter, Result};

/// Opening marker on the very first line
static OPENING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A---[ \t]*\r?\n").unwrap());

/// Full block: opening marker, YAML, closing marker on its own line
static FRONTMATTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)\A---[ \t]*\r?\n(.*?)^---[ \t]*\r?$\n?").unwrap());

/// Outcome of splitting a document into front-matter and body
#[derive(Debug, Clone, PartialEq)]
pub enum FrontmatterSplit<'a> {
    /// No opening marker: the whole text is body
    Absent,
    /// A well-formed block
    Present {
        frontmatter: Frontmatter,
        body: &'a str,
    },
    /// An opening marker, but the block is unclosed or not a YAML mapping
    Malformed { reason: String },
}

/// Split raw document text into its front-matter block and the body.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    if !OPENING_PATTERN.is_match(content) {
        return FrontmatterSplit::Absent;
    }

    let Some(caps) = FRONTMATTER_PATTERN.captures(content) else {
        return FrontmatterSplit::Malformed {
            reason: "front-matter block is not closed".to_string(),
        };
    };
    let yaml = caps.get(1).map_or("", |m| m.as_str());
    let end = caps.get(0).map_or(0, |m| m.end());

    match parse_frontmatter(yaml) {
        Ok(frontmatter) => FrontmatterSplit::Present {
            frontmatter,
            body: &content[end..],
        },
        Err(e) => FrontmatterSplit::Malformed {
            reason: e.to_string(),
        },
    }
}

/// Parse the YAML between the markers into a mapping.
///
/// An empty block is an empty mapping; scalars and sequences are rejected.
pub fn parse_frontmatter(yaml: &str) -> Result<Frontmatter> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    match serde_yaml::from_str::<serde_json::Value>(yaml) {
        Ok(serde_json::Value::Object(map)) => Ok(Frontmatter {
            data: map.into_iter().collect(),
        }),
        Ok(serde_json::Value::Null) => Ok(Frontmatter::default()),
        Ok(_) => Err(Error::parse_error("front-matter is not a key/value mapping")),
        Err(e) => Err(Error::parse_error(format!("invalid front-matter YAML: {}", e))),
    }
}
