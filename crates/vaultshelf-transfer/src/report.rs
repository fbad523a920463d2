//! Transfer report: structure, per-document asset outcomes and failures.

use crate::orchestrator::TransferState;
use crate::service::RemoteId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use vaultshelf_core::prelude::*;
use vaultshelf_core::to_json_string;
use vaultshelf_vault::HierarchyCounts;

/// Whether a run may mutate the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    DryRun,
    Live,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DryRun => "dry run",
            Self::Live => "live",
        })
    }
}

/// Kind of problem recorded in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    VaultEmpty,
    ConnectivityFailure,
    ReferenceUnresolved,
    UploadRateLimited,
    UploadFailedPermanently,
    RemoteCreateFailed,
    FrontmatterMalformed,
    PageUpdateFailed,
    DocumentUnreadable,
}

impl FailureKind {
    /// Fatal kinds stop the run before anything is created
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::VaultEmpty | Self::ConnectivityFailure)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One recorded problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub kind: FailureKind,
    /// Path or reference the failure concerns
    pub item: String,
    pub detail: String,
}

/// What happened to one hierarchy target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Dry run: would be created
    Planned,
    Created,
    /// An existing shelf with the same name was used
    Reused,
    Failed,
    /// Not attempted because its container failed
    Skipped,
}

/// Per-document detail: title, parse warnings and every asset reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub title: String,
    pub warnings: Vec<String>,
    pub assets: Vec<AssetReport>,
    /// Live runs: the page body was updated with uploaded asset links
    pub body_rewritten: bool,
}

/// A reference with its resolution and, in live runs, its upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReport {
    pub reference: AssetReference,
    pub upload: Option<UploadOutcome>,
}

/// One shelf, book, chapter or page in transfer order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureEntry {
    pub level: HierarchyLevel,
    pub name: String,
    /// Nesting below the shelf (shelf 0, book 1, ...)
    pub indent: usize,
    /// Vault-relative source path
    pub source: Option<PathBuf>,
    pub status: EntryStatus,
    pub remote_id: Option<RemoteId>,
    pub document: Option<DocumentReport>,
}

/// Aggregate numbers for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferTotals {
    pub books_created: usize,
    pub chapters_created: usize,
    pub pages_created: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub assets_found: usize,
    pub assets_unresolved: usize,
    pub uploads_succeeded: usize,
    pub uploads_failed: usize,
}

/// Full account of one run, dry or live
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub state: TransferState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub vault: PathBuf,
    pub shelf: String,
    /// Targets the hierarchy builder planned, identical for dry and live runs
    pub planned: HierarchyCounts,
    pub totals: TransferTotals,
    pub structure: Vec<StructureEntry>,
    pub failures: Vec<FailureEntry>,
}

impl TransferReport {
    pub fn new(mode: RunMode, vault: &Path, shelf: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            state: TransferState::Planning,
            started_at: Utc::now(),
            finished_at: None,
            vault: vault.to_path_buf(),
            shelf: shelf.into(),
            planned: HierarchyCounts::default(),
            totals: TransferTotals::default(),
            structure: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Record a failure
    pub fn record(&mut self, kind: FailureKind, item: impl Into<String>, detail: impl Into<String>) {
        let entry = FailureEntry {
            kind,
            item: item.into(),
            detail: detail.into(),
        };
        if kind.is_fatal() {
            log::error!("{}: {} ({})", entry.kind, entry.item, entry.detail);
        } else {
            log::warn!("{}: {} ({})", entry.kind, entry.item, entry.detail);
        }
        self.failures.push(entry);
    }

    pub fn push_entry(&mut self, entry: StructureEntry) {
        self.structure.push(entry);
    }

    /// Stamp the final state and compute totals
    pub fn finish(&mut self, state: TransferState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
        self.totals = self.compute_totals();
    }

    /// Whether the run stopped on a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.failures.iter().any(|f| f.kind.is_fatal())
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &FailureEntry> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    /// Page entries that carry document detail
    pub fn documents(&self) -> impl Iterator<Item = (&StructureEntry, &DocumentReport)> {
        self.structure
            .iter()
            .filter_map(|e| e.document.as_ref().map(|d| (e, d)))
    }

    fn compute_totals(&self) -> TransferTotals {
        let mut totals = TransferTotals::default();
        for entry in &self.structure {
            let created = entry.status == EntryStatus::Created;
            match entry.level {
                HierarchyLevel::Book if created => totals.books_created += 1,
                HierarchyLevel::Chapter if created => totals.chapters_created += 1,
                HierarchyLevel::Page => match entry.status {
                    EntryStatus::Created => totals.pages_created += 1,
                    EntryStatus::Failed => totals.pages_failed += 1,
                    EntryStatus::Skipped => totals.pages_skipped += 1,
                    _ => {}
                },
                _ => {}
            }
        }
        for (_, document) in self.documents() {
            for asset in &document.assets {
                totals.assets_found += 1;
                if !asset.reference.is_resolved() {
                    totals.assets_unresolved += 1;
                }
                match &asset.upload {
                    Some(outcome) if outcome.is_success() => totals.uploads_succeeded += 1,
                    Some(_) => totals.uploads_failed += 1,
                    None => {}
                }
            }
        }
        totals
    }

    pub fn to_json(&self) -> Result<String> {
        to_json_string(self, "transfer report")
    }

    /// Plain-text summary: structure tree, totals and failures
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "Transfer {} ({}) - {}", self.run_id, self.mode, self.state)?;
        writeln!(out, "Vault: {}", self.vault.display())?;
        writeln!(
            out,
            "Planned: {} books, {} chapters, {} pages",
            self.planned.books, self.planned.chapters, self.planned.pages
        )?;

        if !self.structure.is_empty() {
            writeln!(out)?;
        }
        for entry in &self.structure {
            let pad = "  ".repeat(entry.indent);
            write!(out, "{}[{}] {}", pad, entry.level, entry.name)?;
            if let Some(source) = &entry.source {
                write!(out, " ({})", source.display())?;
            }
            writeln!(out, " - {}", status_label(entry.status))?;

            let Some(document) = &entry.document else {
                continue;
            };
            for asset in &document.assets {
                let reference = &asset.reference;
                write!(out, "{}    {} ", pad, reference.raw_markup)?;
                match &reference.resolved_path {
                    Some(path) => write!(
                        out,
                        "-> {} [{}]",
                        path.display(),
                        reference.resolution_strategy
                    )?,
                    None => write!(out, "-> unresolved")?,
                }
                if !reference.alternatives.is_empty() {
                    write!(out, " (+{} other matches)", reference.alternatives.len())?;
                }
                match &asset.upload {
                    Some(outcome) if outcome.is_success() => write!(
                        out,
                        " uploaded as {}",
                        outcome.remote_url.as_deref().unwrap_or_default()
                    )?,
                    Some(outcome) => write!(
                        out,
                        " upload failed after {} attempt(s)",
                        outcome.attempt_count
                    )?,
                    None => {}
                }
                writeln!(out)?;
            }
        }

        let t = &self.totals;
        writeln!(out)?;
        match self.mode {
            RunMode::DryRun => writeln!(
                out,
                "Totals: {} assets found, {} unresolved",
                t.assets_found, t.assets_unresolved
            )?,
            RunMode::Live => {
                writeln!(
                    out,
                    "Totals: {} books, {} chapters, {} pages created; {} pages failed, {} skipped",
                    t.books_created, t.chapters_created, t.pages_created, t.pages_failed, t.pages_skipped
                )?;
                writeln!(
                    out,
                    "Assets: {} found, {} unresolved, {} uploaded, {} failed",
                    t.assets_found, t.assets_unresolved, t.uploads_succeeded, t.uploads_failed
                )?;
            }
        }

        if self.failures.is_empty() {
            writeln!(out, "No failures")?;
        } else {
            writeln!(out, "Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(out, "  - {}: {}: {}", failure.kind, failure.item, failure.detail)?;
            }
        }
        Ok(())
    }
}

fn status_label(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Planned => "planned",
        EntryStatus::Created => "created",
        EntryStatus::Reused => "reused",
        EntryStatus::Failed => "FAILED",
        EntryStatus::Skipped => "skipped",
    }
}
