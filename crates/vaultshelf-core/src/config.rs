//! Configuration types for a vault transfer.
//!
//! A [`TransferConfig`] is loaded from a JSON, YAML or TOML file with the
//! `config` crate, layered under `VAULTSHELF__*` environment variables, and
//! validated before the orchestrator starts. A builder is provided for
//! programmatic construction.

use crate::error::{Error, Result};
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "VAULTSHELF";

fn string_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Source vault settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Path to the vault directory (`~` and `$VARS` are expanded)
    pub path: PathBuf,
    /// Directory or file names skipped during the walk
    pub excluded_paths: BTreeSet<String>,
    /// Extensions treated as images (lowercase, no dot)
    pub image_extensions: BTreeSet<String>,
    /// Extensions treated as attachments (lowercase, no dot)
    pub attachment_extensions: BTreeSet<String>,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            excluded_paths: string_set(&[".obsidian", ".git", ".trash", ".DS_Store", "node_modules"]),
            image_extensions: string_set(&["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"]),
            attachment_extensions: string_set(&[
                "pdf", "doc", "docx", "txt", "rtf", "xls", "xlsx", "csv", "ppt", "pptx", "zip",
                "rar", "7z",
            ]),
        }
    }
}

/// Remote content service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Base URL of the service, e.g. `https://docs.example.com`
    pub url: String,
    pub token_id: String,
    pub token_secret: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            token_id: String::new(),
            token_secret: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Naming and pacing of the transfer itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Shelf every book is placed on
    pub shelf_name: String,
    pub shelf_description: String,
    /// Book collecting the documents at the vault root
    pub root_book_name: String,
    /// Fixed pause before every mutating call
    pub request_delay_ms: u64,
    /// Attempt cap for rate-limited calls (first call included)
    pub max_attempts: u32,
    /// First backoff after a rate-limit response, doubled per retry
    pub initial_backoff_ms: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            shelf_name: "Obsidian Content".to_string(),
            shelf_description: "Content transferred from an Obsidian vault".to_string(),
            root_book_name: "Root Files".to_string(),
            request_delay_ms: 0,
            max_attempts: 3,
            initial_backoff_ms: 2000,
        }
    }
}

/// Complete configuration of one transfer run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    #[serde(alias = "obsidian")]
    pub vault: VaultSettings,
    #[serde(alias = "bookstack")]
    pub remote: RemoteSettings,
    pub transfer: TransferSettings,
}

impl TransferConfig {
    /// Create a new config with builder
    pub fn builder(vault_path: impl Into<PathBuf>) -> TransferConfigBuilder {
        TransferConfigBuilder::new(vault_path)
    }

    /// Load configuration from a file, then apply `VAULTSHELF__*` overrides.
    ///
    /// The file format is picked from the extension (json, yaml, toml).
    /// Nested keys use a double underscore: `VAULTSHELF__REMOTE__TOKEN_SECRET`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config_error(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| {
                Error::config_error(format!("Failed to read {}: {}", path.display(), e))
            })?;

        let mut loaded: TransferConfig = settings
            .try_deserialize()
            .map_err(|e| Error::config_error(format!("Invalid configuration: {}", e)))?;
        loaded.vault.path = expand_path(&loaded.vault.path)?;
        loaded.normalize_extensions();
        Ok(loaded)
    }

    /// Validate everything needed for a run against the remote service
    pub fn validate(&self) -> Result<()> {
        self.validate_local()?;
        self.validate_remote()
    }

    /// Validate the remote URL and credentials only
    pub fn validate_remote(&self) -> Result<()> {
        let url = self.remote.url.trim();
        if url.is_empty() {
            return Err(Error::config_error("Remote URL cannot be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config_error(format!(
                "Remote URL must start with http:// or https://: {}",
                url
            )));
        }
        if self.remote.token_id.trim().is_empty() || self.remote.token_secret.trim().is_empty() {
            return Err(Error::config_error("API token id and secret are required"));
        }

        Ok(())
    }

    /// Validate the vault and transfer sections only
    pub fn validate_local(&self) -> Result<()> {
        if !self.vault.path.is_dir() {
            return Err(Error::config_error(format!(
                "Vault path is not a directory: {}",
                self.vault.path.display()
            )));
        }
        if self.transfer.shelf_name.trim().is_empty() {
            return Err(Error::config_error("Shelf name cannot be empty"));
        }
        if self.transfer.root_book_name.trim().is_empty() {
            return Err(Error::config_error("Root book name cannot be empty"));
        }
        if self.transfer.max_attempts == 0 {
            return Err(Error::config_error("max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Retry policy derived from the transfer settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            request_delay: Duration::from_millis(self.transfer.request_delay_ms),
            max_attempts: self.transfer.max_attempts,
            initial_backoff: Duration::from_millis(self.transfer.initial_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    fn normalize_extensions(&mut self) {
        let normalize = |set: &BTreeSet<String>| -> BTreeSet<String> {
            set.iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect()
        };
        self.vault.image_extensions = normalize(&self.vault.image_extensions);
        self.vault.attachment_extensions = normalize(&self.vault.attachment_extensions);
    }
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| Error::config_error(format!("Cannot expand path {}: {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Builder for TransferConfig
pub struct TransferConfigBuilder {
    config: TransferConfig,
}

impl TransferConfigBuilder {
    /// Create a new builder
    pub fn new(vault_path: impl Into<PathBuf>) -> Self {
        let mut config = TransferConfig::default();
        config.vault.path = vault_path.into();
        Self { config }
    }

    /// Set the remote service URL and credentials
    pub fn remote(
        mut self,
        url: impl Into<String>,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        self.config.remote.url = url.into();
        self.config.remote.token_id = token_id.into();
        self.config.remote.token_secret = token_secret.into();
        self
    }

    pub fn shelf_name(mut self, name: impl Into<String>) -> Self {
        self.config.transfer.shelf_name = name.into();
        self
    }

    pub fn root_book_name(mut self, name: impl Into<String>) -> Self {
        self.config.transfer.root_book_name = name.into();
        self
    }

    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.config.transfer.request_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.transfer.max_attempts = attempts;
        self
    }

    /// Build and validate the vault/transfer sections
    pub fn build(mut self) -> Result<TransferConfig> {
        self.config.normalize_extensions();
        self.config.validate_local()?;
        Ok(self.config)
    }
}
