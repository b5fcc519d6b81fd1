use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tokio::fs;

use super::{campaign_of, AssetStore, CampaignAsset, CampaignListing};
use crate::config::StorageCredentials;
use crate::core::CreativeError;
use crate::http_client::HTTP_CLIENT;

const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
const API_URL: &str = "https://api.dropboxapi.com/2";
const CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Dropbox-backed asset store, authenticated with a long-lived refresh token
pub struct DropboxStore {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<Metadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum Metadata {
    File { name: String, path_display: String },
    Folder {},
    Deleted {},
}

#[derive(Debug, Deserialize)]
struct SharedLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ListSharedLinksResult {
    links: Vec<SharedLink>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: String,
}

/// Raw outcome of an RPC call, before success is decided
struct RpcReply {
    status: StatusCode,
    body: String,
}

impl RpcReply {
    fn error_summary(&self) -> String {
        serde_json::from_str::<ApiErrorBody>(&self.body)
            .map(|e| e.error_summary)
            .unwrap_or_else(|_| self.body.clone())
    }
}

impl DropboxStore {
    /// Exchange the refresh token for an access token and verify the account
    pub async fn connect(credentials: &StorageCredentials) -> Result<Self, CreativeError> {
        let response = HTTP_CLIENT
            .post(TOKEN_URL)
            .basic_auth(&credentials.app_key, Some(&credentials.app_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(storage_error)?;

        let status = response.status();
        let body = response.text().await.map_err(storage_error)?;
        if !status.is_success() {
            return Err(CreativeError::storage(format!(
                "Failed to refresh Dropbox access token ({}): {}",
                status, body
            )));
        }
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CreativeError::storage(format!("Invalid token response: {}", e)))?;

        let store = Self {
            access_token: token.access_token,
        };

        let reply = store.send_rpc("users/get_current_account", None).await?;
        if !reply.status.is_success() {
            return Err(CreativeError::storage(format!(
                "Failed to initialize Dropbox client: {}",
                reply.error_summary()
            )));
        }
        tracing::info!("Dropbox client authenticated.");

        Ok(store)
    }

    async fn send_rpc(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<RpcReply, CreativeError> {
        let mut request = HTTP_CLIENT
            .post(format!("{}/{}", API_URL, endpoint))
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(storage_error)?;
        let status = response.status();
        let body = response.text().await.map_err(storage_error)?;
        Ok(RpcReply { status, body })
    }

    async fn rpc<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<R, CreativeError> {
        let reply = self.send_rpc(endpoint, Some(body)).await?;
        if !reply.status.is_success() {
            return Err(CreativeError::storage(format!(
                "Dropbox {} failed ({}): {}",
                endpoint,
                reply.status,
                reply.error_summary()
            )));
        }
        serde_json::from_str(&reply.body)
            .map_err(|e| CreativeError::storage(format!("Invalid Dropbox {} response: {}", endpoint, e)))
    }

    /// Reuse an existing direct link or create a public one
    async fn shareable_link(&self, path: &str) -> Result<String, CreativeError> {
        let existing: ListSharedLinksResult = self
            .rpc(
                "sharing/list_shared_links",
                json!({ "path": path, "direct_only": true }),
            )
            .await?;

        let url = match existing.links.into_iter().next() {
            Some(link) => link.url,
            None => {
                let created: SharedLink = self
                    .rpc(
                        "sharing/create_shared_link_with_settings",
                        json!({
                            "path": path,
                            "settings": { "requested_visibility": "public" }
                        }),
                    )
                    .await?;
                created.url
            }
        };

        Ok(raw_link(&url))
    }

    async fn list_all_files(&self) -> Result<Vec<(String, String)>, CreativeError> {
        let mut page: ListFolderResult = self
            .rpc("files/list_folder", json!({ "path": "", "recursive": true }))
            .await?;
        let mut files = Vec::new();

        loop {
            for entry in page.entries {
                if let Metadata::File { name, path_display } = entry {
                    files.push((name, path_display));
                }
            }
            if !page.has_more {
                break;
            }
            page = self
                .rpc("files/list_folder/continue", json!({ "cursor": page.cursor }))
                .await?;
        }

        Ok(files)
    }
}

#[async_trait]
impl AssetStore for DropboxStore {
    async fn folder_exists(&self, path: &str) -> Result<bool, CreativeError> {
        let reply = self
            .send_rpc("files/list_folder", Some(json!({ "path": path, "limit": 1 })))
            .await?;

        if reply.status.is_success() {
            return Ok(true);
        }
        let summary = reply.error_summary();
        if reply.status == StatusCode::CONFLICT && is_not_found(&summary) {
            return Ok(false);
        }
        Err(CreativeError::storage(format!(
            "Failed to check folder {}: {}",
            path, summary
        )))
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<String, CreativeError> {
        let bytes = fs::read(local_path).await?;
        let arg = UploadArg {
            path: remote_path,
            mode: "overwrite",
            autorename: false,
            mute: true,
        };

        let response = HTTP_CLIENT
            .post(format!("{}/files/upload", CONTENT_URL))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", header_safe_json(&serde_json::to_string(&arg)?))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(storage_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CreativeError::storage(format!(
                "Upload to {} failed ({}): {}",
                remote_path, status, body
            )));
        }

        self.shareable_link(remote_path).await
    }

    async fn list_campaign_assets(&self) -> Result<CampaignListing, CreativeError> {
        tracing::info!("Fetching all campaign assets from Dropbox...");
        let files = self.list_all_files().await?;

        let mut campaigns = CampaignListing::new();
        for (filename, path_display) in files {
            let Some(campaign) = campaign_of(&path_display) else {
                continue;
            };
            let url = match self.shareable_link(&path_display).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(path = %path_display, error = %e, "No shareable link; skipping asset");
                    continue;
                }
            };
            campaigns
                .entry(campaign)
                .or_default()
                .push(CampaignAsset { url, filename });
        }

        tracing::info!("Successfully found and organized {} campaigns.", campaigns.len());
        Ok(campaigns)
    }
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
    mute: bool,
}

fn storage_error(err: reqwest::Error) -> CreativeError {
    CreativeError::Storage {
        message: err.to_string(),
        source: Some(err),
    }
}

fn is_not_found(error_summary: &str) -> bool {
    error_summary.starts_with("path/not_found")
}

/// Turn a preview link into one that serves the raw file
fn raw_link(url: &str) -> String {
    url.replace("dl=0", "raw=1")
}

/// HTTP headers must be ASCII; Dropbox expects non-ASCII escaped as \uXXXX
fn header_safe_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_links_become_raw() {
        assert_eq!(
            raw_link("https://www.dropbox.com/scl/fi/abc/x.png?rlkey=k&dl=0"),
            "https://www.dropbox.com/scl/fi/abc/x.png?rlkey=k&raw=1"
        );
    }

    #[test]
    fn detects_missing_folder() {
        assert!(is_not_found("path/not_found/.."));
        assert!(!is_not_found("path/malformed_path/"));
    }

    #[test]
    fn escapes_non_ascii_for_headers() {
        assert_eq!(header_safe_json(r#"{"path":"/Café"}"#), r#"{"path":"/Caf\u00e9"}"#);
        assert_eq!(header_safe_json(r#"{"path":"/Summer_Sale"}"#), r#"{"path":"/Summer_Sale"}"#);
        assert_eq!(header_safe_json("😀"), "\\ud83d\\ude00");
    }

    #[test]
    fn parses_list_folder_page() {
        let page: ListFolderResult = serde_json::from_str(
            r#"{
                "entries": [
                    {".tag": "folder", "name": "Spring", "path_display": "/Spring", "id": "id:1"},
                    {".tag": "file", "name": "a.png", "path_display": "/Spring/1:1/a.png", "id": "id:2", "size": 10}
                ],
                "cursor": "c1",
                "has_more": false
            }"#,
        )
        .unwrap();
        assert_eq!(page.entries.len(), 2);
        assert!(matches!(&page.entries[1], Metadata::File { name, .. } if name == "a.png"));
    }

    #[test]
    fn error_summary_falls_back_to_body() {
        let reply = RpcReply {
            status: StatusCode::CONFLICT,
            body: r#"{"error_summary": "path/not_found/...", "error": {}}"#.to_string(),
        };
        assert_eq!(reply.error_summary(), "path/not_found/...");
        let plain = RpcReply {
            status: StatusCode::BAD_REQUEST,
            body: "oops".to_string(),
        };
        assert_eq!(plain.error_summary(), "oops");
    }
}
