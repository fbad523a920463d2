//! # vaultshelf transfer
//!
//! Moves a classified vault into a remote content service.
//!
//! - [`service`] - the [`ContentService`] trait the transfer talks to
//! - [`bookstack`] - [`BookStackClient`], the REST implementation
//! - [`orchestrator`] - [`TransferOrchestrator`], the run state machine
//! - [`report`] - [`TransferReport`] with JSON and plain-text output
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaultshelf_core::TransferConfig;
//! use vaultshelf_transfer::{BookStackClient, RunMode, TransferOrchestrator};
//!
//! # async fn example() -> vaultshelf_core::Result<()> {
//! let config = TransferConfig::load(std::path::Path::new("config.yaml"))?;
//! let client = BookStackClient::new(&config.remote)?;
//! let mut orchestrator = TransferOrchestrator::new(config, Arc::new(client));
//! let report = orchestrator.run(RunMode::DryRun).await?;
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

pub mod bookstack;
pub mod orchestrator;
pub mod report;
pub mod service;

pub use bookstack::{BookStackClient, classify_status};
pub use orchestrator::{TransferOrchestrator, TransferState};
pub use report::{
    AssetReport, DocumentReport, EntryStatus, FailureEntry, FailureKind, RunMode, StructureEntry,
    TransferReport, TransferTotals,
};
pub use service::{
    AssetUpload, ContentService, PageParent, RemoteEntity, RemoteId, RemoteResult, UploadedAsset,
};
