//! Transfer orchestration: a small state machine driving the vault walk,
//! connectivity check and either a dry-run report or the live transfer.

use crate::report::{
    AssetReport, DocumentReport, EntryStatus, FailureKind, RunMode, StructureEntry,
    TransferReport,
};
use crate::service::{AssetUpload, ContentService, PageParent, RemoteId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;
use vaultshelf_core::prelude::*;
use vaultshelf_parser::{ReferenceExtractor, Replacement, parse_document, rewrite_body};
use vaultshelf_vault::{PathResolver, VaultHierarchy};

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Planning,
    Validating,
    DryRunReport,
    Executing,
    Completed,
}

impl TransferState {
    /// Whether the machine may move from `self` to `next`
    pub fn can_transition_to(self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Planning, Validating)
                | (Planning, Completed)
                | (Validating, DryRunReport)
                | (Validating, Executing)
                | (Validating, Completed)
                | (DryRunReport, Completed)
                | (Executing, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == TransferState::Completed
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Planning => "planning",
            Self::Validating => "validating",
            Self::DryRunReport => "dry-run report",
            Self::Executing => "executing",
            Self::Completed => "completed",
        })
    }
}

/// A parsed page with its references resolved
struct PagePlan {
    title: String,
    body: String,
    warnings: Vec<String>,
    references: Vec<AssetReference>,
}

impl PagePlan {
    fn into_report(self, uploads: Vec<Option<UploadOutcome>>, body_rewritten: bool) -> DocumentReport {
        let mut uploads = uploads.into_iter();
        DocumentReport {
            title: self.title,
            warnings: self.warnings,
            assets: self
                .references
                .into_iter()
                .map(|reference| AssetReport {
                    reference,
                    upload: uploads.next().flatten(),
                })
                .collect(),
            body_rewritten,
        }
    }
}

/// Drives one transfer from planning to a completed [`TransferReport`].
///
/// An orchestrator runs once; a second [`run`](Self::run) fails with
/// [`Error::InvalidTransition`].
pub struct TransferOrchestrator {
    config: TransferConfig,
    service: Arc<dyn ContentService>,
    extractor: ReferenceExtractor,
    policy: RetryPolicy,
    state: TransferState,
}

impl TransferOrchestrator {
    pub fn new(config: TransferConfig, service: Arc<dyn ContentService>) -> Self {
        let extractor = ReferenceExtractor::from_settings(&config.vault);
        let policy = config.retry_policy();
        Self {
            config,
            service,
            extractor,
            policy,
            state: TransferState::Planning,
        }
    }

    /// Override the pacing and backoff derived from the configuration
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Check the remote service without starting a run
    pub async fn test_connection(&self) -> Result<()> {
        self.service
            .check_connection()
            .await
            .map_err(Error::Connectivity)
    }

    fn advance(&mut self, next: TransferState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::invalid_transition(self.state, next));
        }
        log::debug!("Transfer state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn complete(&mut self, mut report: TransferReport) -> Result<TransferReport> {
        self.advance(TransferState::Completed)?;
        report.finish(TransferState::Completed);
        log::info!(
            "Transfer finished: {} pages created, {} failures",
            report.totals.pages_created,
            report.failures.len()
        );
        Ok(report)
    }

    /// Run the whole transfer in `mode`.
    ///
    /// Vault and connectivity problems end the run early with a fatal
    /// report; per-item failures are recorded and the run carries on.
    #[instrument(skip(self), name = "transfer_run")]
    pub async fn run(&mut self, mode: RunMode) -> Result<TransferReport> {
        if self.state != TransferState::Planning {
            return Err(Error::invalid_transition(
                self.state,
                TransferState::Validating,
            ));
        }
        let mut report = TransferReport::new(
            mode,
            &self.config.vault.path,
            self.config.transfer.shelf_name.as_str(),
        );

        log::info!(
            "Planning {} transfer of {}",
            mode,
            self.config.vault.path.display()
        );
        let hierarchy = match VaultHierarchy::from_config(&self.config) {
            Ok(hierarchy) => hierarchy,
            Err(e @ Error::VaultEmpty { .. }) => {
                report.record(
                    FailureKind::VaultEmpty,
                    self.config.vault.path.display().to_string(),
                    e.to_string(),
                );
                return self.complete(report);
            }
            Err(e) => {
                self.advance(TransferState::Completed)?;
                return Err(e);
            }
        };
        report.planned = hierarchy.counts();

        self.advance(TransferState::Validating)?;
        if let Err(e) = self.service.check_connection().await {
            report.record(
                FailureKind::ConnectivityFailure,
                self.config.remote.url.clone(),
                e.to_string(),
            );
            return self.complete(report);
        }

        let resolver = PathResolver::from_hierarchy(&hierarchy);
        match mode {
            RunMode::DryRun => {
                self.advance(TransferState::DryRunReport)?;
                self.dry_run(&hierarchy, &resolver, &mut report).await;
            }
            RunMode::Live => {
                self.advance(TransferState::Executing)?;
                self.execute(&hierarchy, &resolver, &mut report).await;
            }
        }
        self.complete(report)
    }

    async fn dry_run(
        &self,
        hierarchy: &VaultHierarchy,
        resolver: &PathResolver,
        report: &mut TransferReport,
    ) {
        for (id, target) in hierarchy.iter() {
            let mut entry = entry_for(hierarchy, id, target, EntryStatus::Planned);
            if let (HierarchyTarget::Page { .. }, Some(node)) = (target, hierarchy.source_node(id)) {
                match self.plan_page(node, resolver, report).await {
                    Some(plan) => entry.document = Some(plan.into_report(Vec::new(), false)),
                    None => entry.status = EntryStatus::Failed,
                }
            }
            report.push_entry(entry);
        }
    }

    /// Read, parse, extract and resolve one page. `None` when the file
    /// cannot be read.
    async fn plan_page(
        &self,
        node: &VaultNode,
        resolver: &PathResolver,
        report: &mut TransferReport,
    ) -> Option<PagePlan> {
        let item = node.relative.display().to_string();
        let raw = match tokio::fs::read_to_string(&node.path).await {
            Ok(raw) => raw,
            Err(e) => {
                report.record(FailureKind::DocumentUnreadable, item, e.to_string());
                return None;
            }
        };

        let document = parse_document(&node.path, &raw);
        for warning in &document.warnings {
            report.record(FailureKind::FrontmatterMalformed, &item, warning);
        }

        let mut references = self.extractor.extract(&document.body);
        resolver.resolve_all(&mut references, &node.path);
        for reference in references.iter().filter(|r| !r.is_resolved()) {
            report.record(
                FailureKind::ReferenceUnresolved,
                &item,
                format!("{} not found in the vault", reference.raw_markup),
            );
        }
        log::debug!(
            "Planned {} with {} asset reference(s)",
            item,
            references.len()
        );

        Some(PagePlan {
            title: document.title,
            body: document.body,
            warnings: document.warnings,
            references,
        })
    }

    async fn execute(
        &self,
        hierarchy: &VaultHierarchy,
        resolver: &PathResolver,
        report: &mut TransferReport,
    ) {
        let service = self.service.as_ref();
        let mut remote: HashMap<TargetId, RemoteId> = HashMap::new();

        for (id, target) in hierarchy.iter() {
            let mut entry = entry_for(hierarchy, id, target, EntryStatus::Skipped);

            let parent = match hierarchy.parent_of(id) {
                Some(parent) => match remote.get(&parent) {
                    Some(remote_id) => Some(*remote_id),
                    None => {
                        log::debug!("Skipping {} '{}': container unavailable", target.level(), target.name());
                        // Skipped pages still count their references
                        if let (HierarchyTarget::Page { .. }, Some(node)) = (target, hierarchy.source_node(id)) {
                            if let Some(plan) = self.plan_page(node, resolver, report).await {
                                entry.document = Some(plan.into_report(Vec::new(), false));
                            }
                        }
                        report.push_entry(entry);
                        continue;
                    }
                },
                None => None,
            };

            let created = match (target, parent) {
                (HierarchyTarget::Shelf { name }, _) => self.ensure_shelf(name, report).await,
                (HierarchyTarget::Book { name, .. }, Some(shelf)) => {
                    let description = match entry.source.as_deref() {
                        Some(folder) => format!("Transferred from Obsidian - folder: {}", folder.display()),
                        None => "Transferred from Obsidian - files at the vault root".to_string(),
                    };
                    let attempted = paced_retry(&self.policy, "create book", || {
                        service.create_book(shelf, name, &description)
                    })
                    .await;
                    let created = self.created(attempted, name, EntryStatus::Created, report);
                    if let Some((book, _)) = created {
                        self.attach_book(shelf, book, name, report).await;
                    }
                    created
                }
                (HierarchyTarget::Chapter { name, .. }, Some(book)) => {
                    let description = format!(
                        "Chapter for folder: {}",
                        entry.source.as_deref().unwrap_or(Path::new(name)).display()
                    );
                    let attempted = paced_retry(&self.policy, "create chapter", || {
                        service.create_chapter(book, name, &description)
                    })
                    .await;
                    self.created(attempted, name, EntryStatus::Created, report)
                }
                (HierarchyTarget::Page { parent: kind, .. }, Some(container)) => {
                    let parent = match kind {
                        ParentTarget::Book(_) => PageParent::Book(container),
                        ParentTarget::Chapter(_) => PageParent::Chapter(container),
                    };
                    match hierarchy.source_node(id) {
                        Some(node) => self.transfer_page(node, parent, resolver, report, &mut entry).await,
                        None => None,
                    }
                }
                _ => None,
            };

            match created {
                Some((remote_id, status)) => {
                    remote.insert(id, remote_id);
                    entry.remote_id = Some(remote_id);
                    entry.status = status;
                }
                None => entry.status = EntryStatus::Failed,
            }
            report.push_entry(entry);
        }
    }

    fn created(
        &self,
        attempted: Attempted<RemoteId>,
        item: &str,
        status: EntryStatus,
        report: &mut TransferReport,
    ) -> Option<(RemoteId, EntryStatus)> {
        match attempted.result {
            Ok(id) => Some((id, status)),
            Err(e) => {
                report.record(
                    FailureKind::RemoteCreateFailed,
                    item,
                    format!("{} after {} attempt(s)", e, attempted.attempts),
                );
                None
            }
        }
    }

    /// Place a created book on the shelf. A failure is recorded but the
    /// book keeps its id so its chapters and pages still transfer.
    async fn attach_book(
        &self,
        shelf: RemoteId,
        book: RemoteId,
        name: &str,
        report: &mut TransferReport,
    ) {
        let service = self.service.as_ref();
        let attached =
            paced_retry(&self.policy, "attach book", || service.attach_book(shelf, book)).await;
        if let Err(e) = attached.result {
            report.record(
                FailureKind::RemoteCreateFailed,
                name,
                format!(
                    "attach to shelf {}: {} after {} attempt(s)",
                    shelf, e, attached.attempts
                ),
            );
        }
    }

    /// Reuse a shelf with the same name, else create it
    async fn ensure_shelf(
        &self,
        name: &str,
        report: &mut TransferReport,
    ) -> Option<(RemoteId, EntryStatus)> {
        let service = self.service.as_ref();
        let listed = paced_retry(&self.policy, "list shelves", || service.list_shelves()).await;
        match listed.result {
            Ok(shelves) => {
                if let Some(existing) = shelves.into_iter().find(|s| s.name == name) {
                    log::info!("Reusing shelf '{}' ({})", name, existing.id);
                    return Some((existing.id, EntryStatus::Reused));
                }
            }
            Err(e) => log::warn!("Could not list shelves, creating '{}': {}", name, e),
        }

        let description = &self.config.transfer.shelf_description;
        let attempted = paced_retry(&self.policy, "create shelf", || {
            service.create_shelf(name, description)
        })
        .await;
        self.created(attempted, name, EntryStatus::Created, report)
    }

    /// Create one page, upload its assets, then point the body at them
    async fn transfer_page(
        &self,
        node: &VaultNode,
        parent: PageParent,
        resolver: &PathResolver,
        report: &mut TransferReport,
        entry: &mut StructureEntry,
    ) -> Option<(RemoteId, EntryStatus)> {
        let plan = self.plan_page(node, resolver, report).await?;
        let item = node.relative.display().to_string();
        let service = self.service.as_ref();

        let attempted = paced_retry(&self.policy, "create page", || {
            service.create_page(parent, &plan.title, &plan.body)
        })
        .await;
        let page = match attempted.result {
            Ok(page) => page,
            Err(e) => {
                report.record(
                    FailureKind::RemoteCreateFailed,
                    item,
                    format!("{} after {} attempt(s)", e, attempted.attempts),
                );
                entry.document = Some(plan.into_report(Vec::new(), false));
                return None;
            }
        };

        let uploads = self
            .upload_assets(page, &plan.references, &item, report)
            .await;
        let replacements: Vec<Replacement<'_>> = plan
            .references
            .iter()
            .zip(&uploads)
            .filter_map(|(reference, outcome)| {
                let url = outcome.as_ref()?.remote_url.as_deref()?;
                Some(Replacement { reference, url })
            })
            .collect();
        let body = rewrite_body(&plan.body, &replacements);

        let mut rewritten = false;
        if body != plan.body {
            let updated =
                paced_retry(&self.policy, "update page", || service.update_page(page, &body)).await;
            match updated.result {
                Ok(()) => rewritten = true,
                Err(e) => report.record(FailureKind::PageUpdateFailed, &item, e.to_string()),
            }
        }

        log::info!("Transferred {} as page {}", item, page);
        entry.document = Some(plan.into_report(uploads, rewritten));
        Some((page, EntryStatus::Created))
    }

    /// Upload each distinct resolved file once; repeated references share
    /// the first outcome.
    async fn upload_assets(
        &self,
        page: RemoteId,
        references: &[AssetReference],
        item: &str,
        report: &mut TransferReport,
    ) -> Vec<Option<UploadOutcome>> {
        let mut uploaded: HashMap<&Path, UploadOutcome> = HashMap::new();
        let mut outcomes = Vec::with_capacity(references.len());

        for (index, reference) in references.iter().enumerate() {
            let Some(path) = reference.resolved_path.as_deref() else {
                outcomes.push(None);
                continue;
            };
            if let Some(previous) = uploaded.get(path) {
                outcomes.push(Some(UploadOutcome {
                    reference: index,
                    ..previous.clone()
                }));
                continue;
            }

            let outcome = self
                .upload_one(page, index, reference, path, item, report)
                .await;
            uploaded.insert(path, outcome.clone());
            outcomes.push(Some(outcome));
        }
        outcomes
    }

    async fn upload_one(
        &self,
        page: RemoteId,
        index: usize,
        reference: &AssetReference,
        path: &Path,
        item: &str,
        report: &mut TransferReport,
    ) -> UploadOutcome {
        let failed_item = format!("{}: {}", item, reference.raw_markup);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let detail = format!("cannot read {}: {}", path.display(), e);
                report.record(FailureKind::UploadFailedPermanently, failed_item, &detail);
                return UploadOutcome::failed(index, 0, detail);
            }
        };

        let upload = AssetUpload {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| reference.declared_path.clone()),
            bytes,
            kind: reference.asset_kind,
        };
        let service = self.service.as_ref();
        let attempted =
            paced_retry(&self.policy, "upload asset", || service.upload_asset(page, &upload)).await;

        match attempted.result {
            Ok(asset) => {
                if attempted.attempts > 1 {
                    report.record(
                        FailureKind::UploadRateLimited,
                        failed_item,
                        format!("uploaded after {} attempt(s)", attempted.attempts),
                    );
                }
                UploadOutcome::succeeded(index, attempted.attempts, asset.id, asset.url)
            }
            Err(e) => {
                if e.is_rate_limited() {
                    log::warn!(
                        "{}: {} gave up after {} attempt(s)",
                        FailureKind::UploadRateLimited,
                        failed_item,
                        attempted.attempts
                    );
                }
                report.record(
                    FailureKind::UploadFailedPermanently,
                    failed_item,
                    format!("{} after {} attempt(s)", e, attempted.attempts),
                );
                UploadOutcome::failed(index, attempted.attempts, e.to_string())
            }
        }
    }
}

fn entry_for(
    hierarchy: &VaultHierarchy,
    id: TargetId,
    target: &HierarchyTarget,
    status: EntryStatus,
) -> StructureEntry {
    StructureEntry {
        level: target.level(),
        name: target.name().to_string(),
        indent: std::iter::successors(hierarchy.parent_of(id), |p| hierarchy.parent_of(*p)).count(),
        source: hierarchy.source_node(id).map(|n| n.relative.clone()),
        status,
        remote_id: None,
        document: None,
    }
}
