//! Shared fixtures: an in-memory content service that records every call
//! and fails on cue, plus a vault builder.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tempfile::TempDir;
use vaultshelf_core::{AssetKind, RemoteError, TransferConfig};
use vaultshelf_transfer::{
    AssetUpload, ContentService, PageParent, RemoteEntity, RemoteId, RemoteResult, UploadedAsset,
};

pub const UPLOAD_BASE: &str = "https://mock.example/uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CheckConnection,
    ListShelves,
    CreateShelf(String),
    CreateBook { shelf: RemoteId, name: String },
    AttachBook { shelf: RemoteId, book: RemoteId },
    CreateChapter { book: RemoteId, name: String },
    CreatePage { parent: PageParent, title: String },
    UpdatePage { page: RemoteId },
    UploadAsset { page: RemoteId, file_name: String, kind: AssetKind },
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::CheckConnection | Call::ListShelves)
    }
}

#[derive(Default)]
pub struct RecordingService {
    calls: Mutex<Vec<Call>>,
    pages: Mutex<BTreeMap<RemoteId, (String, String)>>,
    next_id: AtomicU64,
    offline: bool,
    existing_shelves: Vec<RemoteEntity>,
    failing_books: HashSet<String>,
    failing_pages: HashSet<String>,
    failing_attaches: bool,
    rate_limited_attaches: AtomicU32,
    rate_limited_uploads: AtomicU32,
    always_rate_limit_uploads: bool,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection check fails
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn with_shelf(mut self, id: RemoteId, name: &str) -> Self {
        self.existing_shelves.push(RemoteEntity {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn fail_book(mut self, name: &str) -> Self {
        self.failing_books.insert(name.to_string());
        self
    }

    pub fn fail_page(mut self, title: &str) -> Self {
        self.failing_pages.insert(title.to_string());
        self
    }

    /// Every shelf attach is rejected
    pub fn fail_attaches(mut self) -> Self {
        self.failing_attaches = true;
        self
    }

    /// The next `count` shelf attaches answer with a rate-limit error
    pub fn rate_limit_attaches(self, count: u32) -> Self {
        self.rate_limited_attaches.store(count, Ordering::SeqCst);
        self
    }

    /// The next `count` uploads answer with a rate-limit error
    pub fn rate_limit_uploads(self, count: u32) -> Self {
        self.rate_limited_uploads.store(count, Ordering::SeqCst);
        self
    }

    pub fn always_rate_limit_uploads(mut self) -> Self {
        self.always_rate_limit_uploads = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Final markdown of the page with the given title
    pub fn page_markdown(&self, title: &str) -> Option<String> {
        self.pages
            .lock()
            .unwrap()
            .values()
            .find(|(t, _)| t == title)
            .map(|(_, markdown)| markdown.clone())
    }

    pub fn page_titles(&self) -> Vec<String> {
        self.pages
            .lock()
            .unwrap()
            .values()
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::UploadAsset { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> RemoteId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl ContentService for RecordingService {
    async fn check_connection(&self) -> RemoteResult<()> {
        self.record(Call::CheckConnection);
        if self.offline {
            return Err(RemoteError::request_failed(Some(401), "invalid token"));
        }
        Ok(())
    }

    async fn list_shelves(&self) -> RemoteResult<Vec<RemoteEntity>> {
        self.record(Call::ListShelves);
        Ok(self.existing_shelves.clone())
    }

    async fn create_shelf(&self, name: &str, _description: &str) -> RemoteResult<RemoteId> {
        self.record(Call::CreateShelf(name.to_string()));
        Ok(self.next_id())
    }

    async fn create_book(
        &self,
        shelf: RemoteId,
        name: &str,
        _description: &str,
    ) -> RemoteResult<RemoteId> {
        self.record(Call::CreateBook {
            shelf,
            name: name.to_string(),
        });
        if self.failing_books.contains(name) {
            return Err(RemoteError::request_failed(Some(422), "book rejected"));
        }
        Ok(self.next_id())
    }

    async fn attach_book(&self, shelf: RemoteId, book: RemoteId) -> RemoteResult<()> {
        self.record(Call::AttachBook { shelf, book });
        if self.failing_attaches {
            return Err(RemoteError::request_failed(Some(403), "shelf is read-only"));
        }
        if take_one(&self.rate_limited_attaches) {
            return Err(RemoteError::rate_limited("slow down"));
        }
        Ok(())
    }

    async fn create_chapter(
        &self,
        book: RemoteId,
        name: &str,
        _description: &str,
    ) -> RemoteResult<RemoteId> {
        self.record(Call::CreateChapter {
            book,
            name: name.to_string(),
        });
        Ok(self.next_id())
    }

    async fn create_page(
        &self,
        parent: PageParent,
        title: &str,
        markdown: &str,
    ) -> RemoteResult<RemoteId> {
        self.record(Call::CreatePage {
            parent,
            title: title.to_string(),
        });
        if self.failing_pages.contains(title) {
            return Err(RemoteError::request_failed(Some(500), "page rejected"));
        }
        let id = self.next_id();
        self.pages
            .lock()
            .unwrap()
            .insert(id, (title.to_string(), markdown.to_string()));
        Ok(id)
    }

    async fn update_page(&self, page: RemoteId, markdown: &str) -> RemoteResult<()> {
        self.record(Call::UpdatePage { page });
        match self.pages.lock().unwrap().get_mut(&page) {
            Some(entry) => {
                entry.1 = markdown.to_string();
                Ok(())
            }
            None => Err(RemoteError::request_failed(Some(404), "no such page")),
        }
    }

    async fn upload_asset(
        &self,
        page: RemoteId,
        asset: &AssetUpload,
    ) -> RemoteResult<UploadedAsset> {
        self.record(Call::UploadAsset {
            page,
            file_name: asset.file_name.clone(),
            kind: asset.kind,
        });
        if self.always_rate_limit_uploads {
            return Err(RemoteError::rate_limited("slow down"));
        }
        if take_one(&self.rate_limited_uploads) {
            return Err(RemoteError::rate_limited("slow down"));
        }
        let id = self.next_id();
        Ok(UploadedAsset {
            id,
            url: format!("{}/{}/{}", UPLOAD_BASE, id, asset.file_name),
        })
    }
}

/// Consume one scripted failure, if any are left
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Write `files` (relative path, content) into a fresh vault
pub fn vault(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (relative, content) in files {
        write(temp.path(), relative, content);
    }
    temp
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn config(vault: &TempDir) -> TransferConfig {
    TransferConfig::builder(vault.path())
        .remote("https://docs.example.com", "token-id", "token-secret")
        .build()
        .unwrap()
}
