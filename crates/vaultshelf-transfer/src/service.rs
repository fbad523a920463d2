//! Remote content-service abstraction.
//!
//! The orchestrator only talks to a [`ContentService`]; the BookStack REST
//! client is one implementation, test doubles are another.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vaultshelf_core::{AssetKind, RemoteError};

/// Identifier the remote service assigns to a created item
pub type RemoteId = u64;

/// Result of one remote call
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// An existing remote item, as returned by listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub id: RemoteId,
    pub name: String,
}

/// Container a page is created in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageParent {
    Book(RemoteId),
    Chapter(RemoteId),
}

/// File contents to attach to a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub kind: AssetKind,
}

impl AssetUpload {
    /// Display name: the file name without its extension
    pub fn display_name(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map_or(self.file_name.as_str(), |(stem, _)| stem)
    }
}

/// Where an uploaded asset can be linked from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub id: RemoteId,
    pub url: String,
}

/// Operations the transfer needs from the destination.
///
/// Every call distinguishes [`RemoteError::RateLimited`] from other
/// failures so callers can back off.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Confirm the service is reachable and the credentials are accepted
    async fn check_connection(&self) -> RemoteResult<()>;

    async fn list_shelves(&self) -> RemoteResult<Vec<RemoteEntity>>;

    async fn create_shelf(&self, name: &str, description: &str) -> RemoteResult<RemoteId>;

    /// Create a book destined for `shelf`. Placement on the shelf is a
    /// separate [`attach_book`](Self::attach_book) call.
    async fn create_book(
        &self,
        shelf: RemoteId,
        name: &str,
        description: &str,
    ) -> RemoteResult<RemoteId>;

    /// Put an existing book on `shelf`, keeping the books already there
    async fn attach_book(&self, shelf: RemoteId, book: RemoteId) -> RemoteResult<()>;

    async fn create_chapter(
        &self,
        book: RemoteId,
        name: &str,
        description: &str,
    ) -> RemoteResult<RemoteId>;

    async fn create_page(
        &self,
        parent: PageParent,
        title: &str,
        markdown: &str,
    ) -> RemoteResult<RemoteId>;

    /// Replace a page's markdown body
    async fn update_page(&self, page: RemoteId, markdown: &str) -> RemoteResult<()>;

    /// Upload an image or attachment owned by `page`
    async fn upload_asset(&self, page: RemoteId, asset: &AssetUpload)
    -> RemoteResult<UploadedAsset>;
}
