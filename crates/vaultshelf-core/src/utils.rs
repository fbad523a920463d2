//! Shared helpers for serialization and vault path containment.

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Generic JSON serialization with consistent error handling
pub fn to_json_string<T: serde::Serialize + ?Sized>(data: &T, context: &str) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| Error::other(format!("Failed to serialize {} as JSON: {}", context, e)))
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Whether `candidate` stays inside `vault_root` once `..` segments are
/// folded and, where both exist, symlinks are resolved.
pub fn is_within_vault(vault_root: &Path, candidate: &Path) -> bool {
    if let (Ok(root), Ok(full)) = (vault_root.canonicalize(), candidate.canonicalize()) {
        return full.starts_with(root);
    }
    normalize_path(candidate).starts_with(normalize_path(vault_root))
}
