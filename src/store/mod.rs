//! Remote store session for the Box folder the crawler archives into.
//!
//! [`BoxSession`] is constructed once at startup and passed by reference to
//! whatever needs remote I/O; there is no ambient client state. It exposes
//! the folder-scoped operations the pipeline needs (list items, download a
//! file, create a file, replace a file's content) and handles one
//! refresh-and-retry when a request comes back 401.
//!
//! Uploads are idempotent by name: when the target filename already exists
//! in the folder its content is replaced, so re-running after a partial
//! failure re-covers the same ground safely.

pub mod auth;

use crate::error::{Error, Result};
use crate::utils::truncate_for_log;
use auth::BoxAuthenticator;
use serde::Deserialize;
use tracing::{debug, info, instrument};

const DEFAULT_API_BASE: &str = "https://api.box.com/2.0";
const DEFAULT_UPLOAD_BASE: &str = "https://upload.box.com/api/2.0";

/// Folder listing page size.
const PAGE_LIMIT: u64 = 1000;

/// One entry of a folder listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub id: String,
    pub name: String,
}

impl FolderItem {
    pub fn is_file(&self) -> bool {
        self.item_type == "file"
    }
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    total_count: u64,
    entries: Vec<FolderItem>,
}

/// An authenticated session scoped to one remote folder.
pub struct BoxSession {
    http: reqwest::Client,
    auth: BoxAuthenticator,
    api_base: String,
    upload_base: String,
    folder_id: String,
}

impl BoxSession {
    pub fn new(http: reqwest::Client, auth: BoxAuthenticator, folder_id: impl Into<String>) -> Self {
        Self {
            http,
            auth,
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            folder_id: folder_id.into(),
        }
    }

    /// Point the session at different API/upload hosts.
    pub fn with_bases(mut self, api: impl Into<String>, upload: impl Into<String>) -> Self {
        self.api_base = api.into();
        self.upload_base = upload.into();
        self
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn authenticator(&self) -> &BoxAuthenticator {
        &self.auth
    }

    /// List every item in the session folder, following pagination.
    #[instrument(level = "info", skip_all, fields(folder_id = %self.folder_id))]
    pub async fn list_folder_items(&self) -> Result<Vec<FolderItem>> {
        let mut items: Vec<FolderItem> = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let url = format!("{}/folders/{}/items", self.api_base, self.folder_id);
            let resp = self
                .send_with_auth("list folder items", |token| {
                    self.http
                        .get(&url)
                        .query(&[("limit", PAGE_LIMIT), ("offset", offset)])
                        .bearer_auth(token)
                })
                .await?;

            let page: ItemsPage = resp.json().await?;
            let received = page.entries.len() as u64;
            items.extend(page.entries);

            if received == 0 || items.len() as u64 >= page.total_count {
                break;
            }
            offset += received;
        }

        debug!(count = items.len(), "Listed folder items");
        Ok(items)
    }

    /// Find a file in the folder by exact name.
    pub async fn find_file(&self, name: &str) -> Result<Option<FolderItem>> {
        let items = self.list_folder_items().await?;
        Ok(items.into_iter().find(|i| i.is_file() && i.name == name))
    }

    /// Download a file's content by id.
    #[instrument(level = "info", skip_all, fields(%file_id))]
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}/content", self.api_base, file_id);
        let resp = self
            .send_with_auth("download file", |token| {
                self.http.get(&url).bearer_auth(token)
            })
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Mirror a document into the folder under `name`.
    ///
    /// Replaces the existing file when one with that name is already
    /// present, creates it otherwise.
    #[instrument(level = "info", skip_all, fields(%name))]
    pub async fn upload_file(&self, name: &str, content: &[u8]) -> Result<()> {
        match self.find_file(name).await? {
            Some(existing) => {
                self.replace_file_content(&existing.id, name, content).await?;
                info!(file_id = %existing.id, "Replaced existing file");
            }
            None => {
                self.create_file(name, content).await?;
                info!("Uploaded new file");
            }
        }
        Ok(())
    }

    async fn create_file(&self, name: &str, content: &[u8]) -> Result<()> {
        let url = format!("{}/files/content", self.upload_base);
        let attributes =
            serde_json::json!({ "name": name, "parent": { "id": self.folder_id } }).to_string();
        let body = content.to_vec();
        let file_name = name.to_string();

        self.send_with_auth("create file", move |token| {
            let form = reqwest::multipart::Form::new()
                .text("attributes", attributes.clone())
                .part(
                    "file",
                    reqwest::multipart::Part::bytes(body.clone()).file_name(file_name.clone()),
                );
            self.http.post(&url).multipart(form).bearer_auth(token)
        })
        .await?;
        Ok(())
    }

    async fn replace_file_content(&self, file_id: &str, name: &str, content: &[u8]) -> Result<()> {
        let url = format!("{}/files/{}/content", self.upload_base, file_id);
        let body = content.to_vec();
        let file_name = name.to_string();

        self.send_with_auth("replace file content", move |token| {
            let form = reqwest::multipart::Form::new().part(
                "file",
                reqwest::multipart::Part::bytes(body.clone()).file_name(file_name.clone()),
            );
            self.http.post(&url).multipart(form).bearer_auth(token)
        })
        .await?;
        Ok(())
    }

    /// Send a request with the current token; on 401, refresh once and
    /// retry. The builder closure is invoked per attempt because request
    /// bodies (multipart forms) cannot be reused.
    async fn send_with_auth<F>(&self, op: &'static str, build: F) -> Result<reqwest::Response>
    where
        F: Fn(String) -> reqwest::RequestBuilder,
    {
        let token = self.auth.current_token().await?;
        let resp = build(token).send().await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!(op, "Request unauthorized; refreshing token and retrying");
            let token = self.auth.refresh_after_unauthorized().await?;
            let resp = build(token).send().await?;
            return Self::checked(op, resp).await;
        }

        Self::checked(op, resp).await
    }

    async fn checked(op: &'static str, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Error::StoreApi {
                op,
                status: status.as_u16(),
                body: truncate_for_log(&body, 200),
            })
        }
    }
}
