mod dropbox;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub use dropbox::DropboxStore;

use crate::core::CreativeError;

/// One stored creative as shown in the gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignAsset {
    pub url: String,
    pub filename: String,
}

/// Campaign display name to its assets
pub type CampaignListing = BTreeMap<String, Vec<CampaignAsset>>;

/// Remote file storage holding one namespace (folder) per campaign
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Whether a folder already exists at `path` (e.g. "/Summer_Sale")
    async fn folder_exists(&self, path: &str) -> Result<bool, CreativeError>;

    /// Upload a local file to `remote_path` and return a public URL for it
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<String, CreativeError>;

    /// Every stored file, grouped by campaign
    async fn list_campaign_assets(&self) -> Result<CampaignListing, CreativeError>;
}

/// Campaign folder for a sanitized name
pub fn campaign_folder(safe_name: &str) -> String {
    format!("/{}", safe_name)
}

/// Display name of the campaign owning `path_display` ("/Summer_Sale/1:1/x.png" -> "Summer Sale")
pub fn campaign_of(path_display: &str) -> Option<String> {
    path_display
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_name_comes_from_first_segment() {
        assert_eq!(
            campaign_of("/Summer_Sale_2024/9:16/a.png").as_deref(),
            Some("Summer Sale 2024")
        );
        assert_eq!(campaign_of("/loose.png").as_deref(), Some("loose.png"));
        assert_eq!(campaign_of("/"), None);
    }

    #[test]
    fn folder_is_rooted() {
        assert_eq!(campaign_folder("Spring"), "/Spring");
    }
}
