//! BookStack REST API client

use crate::service::{
    AssetUpload, ContentService, PageParent, RemoteEntity, RemoteId, RemoteResult, UploadedAsset,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use vaultshelf_core::prelude::*;

/// Characters of an error response body kept in the error detail
const ERROR_BODY_LIMIT: usize = 200;

/// Page size the shelf listing asks for
const LISTING_COUNT: usize = 500;

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: Vec<T>,
    /// Items across all pages; absent on older instances
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: RemoteId,
}

#[derive(Debug, Deserialize)]
struct ShelfDetail {
    #[serde(default)]
    books: Vec<Created>,
}

#[derive(Debug, Deserialize)]
struct GalleryImage {
    id: RemoteId,
    url: String,
}

/// Token-authenticated client for a BookStack instance
pub struct BookStackClient {
    http: Client,
    base_url: String,
    authorization: String,
    /// Book ids known to be on each shelf; the API replaces the whole list
    shelf_books: Mutex<HashMap<RemoteId, Vec<RemoteId>>>,
}

impl BookStackClient {
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::config_error(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            authorization: format!("Token {}:{}", settings.token_id, settings.token_secret),
            shelf_books: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Send an authenticated request and decode the JSON answer
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> RemoteResult<T> {
        let response = request
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| {
                RemoteError::request_failed(
                    e.status().map(|s| s.as_u16()),
                    format!("{} failed: {}", what, e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body)
                .err()
                .unwrap_or_else(|| RemoteError::request_failed(Some(status.as_u16()), body)));
        }

        response.json::<T>().await.map_err(|e| {
            RemoteError::request_failed(
                Some(status.as_u16()),
                format!("Failed to parse {} response: {}", what, e),
            )
        })
    }

    fn asset_form(&self, page: RemoteId, asset: &AssetUpload) -> RemoteResult<Form> {
        let (field, mime) = match asset.kind {
            AssetKind::Image => ("image", image_mime(&asset.file_name)),
            AssetKind::Attachment => ("file", "application/octet-stream"),
        };
        let part = Part::bytes(asset.bytes.clone())
            .file_name(asset.file_name.clone())
            .mime_str(mime)
            .map_err(|e| RemoteError::request_failed(None, format!("Invalid upload part: {}", e)))?;

        let form = Form::new()
            .part(field, part)
            .text("name", asset.display_name().to_string())
            .text("uploaded_to", page.to_string());
        Ok(match asset.kind {
            AssetKind::Image => form.text("type", "gallery"),
            AssetKind::Attachment => form,
        })
    }
}

#[async_trait]
impl ContentService for BookStackClient {
    async fn check_connection(&self) -> RemoteResult<()> {
        let _: serde_json::Value = self
            .send(self.http.get(self.api("books?count=1")), "connection check")
            .await?;
        log::debug!("Connected to {}", self.base_url);
        Ok(())
    }

    async fn list_shelves(&self) -> RemoteResult<Vec<RemoteEntity>> {
        let mut shelves: Vec<RemoteEntity> = Vec::new();
        loop {
            let listing: Listing<RemoteEntity> = self
                .send(
                    self.http.get(self.api(&format!(
                        "shelves?count={}&offset={}",
                        LISTING_COUNT,
                        shelves.len()
                    ))),
                    "list shelves",
                )
                .await?;
            let fetched = listing.data.len();
            shelves.extend(listing.data);

            let more = match listing.total {
                Some(total) => shelves.len() < total,
                None => fetched == LISTING_COUNT,
            };
            if fetched == 0 || !more {
                break;
            }
        }
        Ok(shelves)
    }

    async fn create_shelf(&self, name: &str, description: &str) -> RemoteResult<RemoteId> {
        let created: Created = self
            .send(
                self.http
                    .post(self.api("shelves"))
                    .json(&json!({ "name": name, "description": description })),
                "create shelf",
            )
            .await?;
        self.shelf_books.lock().await.insert(created.id, Vec::new());
        Ok(created.id)
    }

    async fn create_book(
        &self,
        shelf: RemoteId,
        name: &str,
        description: &str,
    ) -> RemoteResult<RemoteId> {
        let created: Created = self
            .send(
                self.http
                    .post(self.api("books"))
                    .json(&json!({ "name": name, "description": description })),
                "create book",
            )
            .await?;
        log::debug!("Created book '{}' ({}) for shelf {}", name, created.id, shelf);
        Ok(created.id)
    }

    async fn attach_book(&self, shelf: RemoteId, book: RemoteId) -> RemoteResult<()> {
        let mut shelves = self.shelf_books.lock().await;
        if !shelves.contains_key(&shelf) {
            let detail: ShelfDetail = self
                .send(self.http.get(self.api(&format!("shelves/{}", shelf))), "read shelf")
                .await?;
            shelves.insert(shelf, detail.books.into_iter().map(|b| b.id).collect());
        }
        let books = shelves.entry(shelf).or_default();
        if !books.contains(&book) {
            books.push(book);
        }

        // The API replaces the shelf's whole book list
        let _: serde_json::Value = self
            .send(
                self.http
                    .put(self.api(&format!("shelves/{}", shelf)))
                    .json(&json!({ "books": books })),
                "update shelf",
            )
            .await?;
        Ok(())
    }

    async fn create_chapter(
        &self,
        book: RemoteId,
        name: &str,
        description: &str,
    ) -> RemoteResult<RemoteId> {
        let created: Created = self
            .send(
                self.http.post(self.api("chapters")).json(&json!({
                    "book_id": book,
                    "name": name,
                    "description": description,
                })),
                "create chapter",
            )
            .await?;
        Ok(created.id)
    }

    async fn create_page(
        &self,
        parent: PageParent,
        title: &str,
        markdown: &str,
    ) -> RemoteResult<RemoteId> {
        let body = match parent {
            PageParent::Book(book) => json!({ "book_id": book, "name": title, "markdown": markdown }),
            PageParent::Chapter(chapter) => {
                json!({ "chapter_id": chapter, "name": title, "markdown": markdown })
            }
        };
        let created: Created = self
            .send(self.http.post(self.api("pages")).json(&body), "create page")
            .await?;
        Ok(created.id)
    }

    async fn update_page(&self, page: RemoteId, markdown: &str) -> RemoteResult<()> {
        let _: serde_json::Value = self
            .send(
                self.http
                    .put(self.api(&format!("pages/{}", page)))
                    .json(&json!({ "markdown": markdown })),
                "update page",
            )
            .await?;
        Ok(())
    }

    async fn upload_asset(
        &self,
        page: RemoteId,
        asset: &AssetUpload,
    ) -> RemoteResult<UploadedAsset> {
        let form = self.asset_form(page, asset)?;
        match asset.kind {
            AssetKind::Image => {
                let image: GalleryImage = self
                    .send(
                        self.http.post(self.api("image-gallery")).multipart(form),
                        "upload image",
                    )
                    .await?;
                Ok(UploadedAsset {
                    id: image.id,
                    url: image.url,
                })
            }
            AssetKind::Attachment => {
                let attachment: Created = self
                    .send(
                        self.http.post(self.api("attachments")).multipart(form),
                        "upload attachment",
                    )
                    .await?;
                Ok(UploadedAsset {
                    id: attachment.id,
                    url: format!("{}/attachments/{}", self.base_url, attachment.id),
                })
            }
        }
    }
}

/// Map an HTTP status to success, a rate-limit signal or a request failure
pub fn classify_status(status: u16, body: &str) -> RemoteResult<()> {
    let detail: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    match status {
        200..=299 => Ok(()),
        429 => Err(RemoteError::rate_limited(if detail.is_empty() {
            "too many requests".to_string()
        } else {
            detail
        })),
        _ => Err(RemoteError::request_failed(Some(status), detail)),
    }
}

fn image_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200, ""), Ok(()));
        assert_eq!(classify_status(204, "ignored"), Ok(()));

        let limited = classify_status(429, "").unwrap_err();
        assert!(limited.is_rate_limited());

        let failed = classify_status(422, "name is required").unwrap_err();
        assert_eq!(
            failed,
            RemoteError::request_failed(Some(422), "name is required")
        );
        assert!(!failed.is_rate_limited());
    }

    #[test]
    fn test_error_body_truncated() {
        let body = "x".repeat(1000);
        match classify_status(500, &body) {
            Err(RemoteError::RequestFailed { detail, .. }) => {
                assert_eq!(detail.len(), ERROR_BODY_LIMIT)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime("a.PNG"), "image/png");
        assert_eq!(image_mime("photo.jpeg"), "image/jpeg");
        assert_eq!(image_mime("icon.svg"), "image/svg+xml");
        assert_eq!(image_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn test_client_urls() {
        let settings = RemoteSettings {
            url: "https://docs.example.com/".to_string(),
            token_id: "id".to_string(),
            token_secret: "secret".to_string(),
            ..Default::default()
        };
        let client = BookStackClient::new(&settings).unwrap();

        assert_eq!(client.base_url(), "https://docs.example.com");
        assert_eq!(client.api("pages/3"), "https://docs.example.com/api/pages/3");
        assert_eq!(client.authorization, "Token id:secret");
    }
}
