//! One campaign request end to end: namespace check, generation, upload,
//! and reporting.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::fs;

use crate::api::GeminiClient;
use crate::config::{Config, OutputConfig};
use crate::core::{CampaignBrief, CreativeError};
use crate::creative::{CreativePipeline, ImageModel, ReferenceUpload, TextModel};
use crate::report::Reporter;
use crate::storage::{campaign_folder, AssetStore, CampaignListing, DropboxStore};

/// Opens the external services a run needs
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open_store(&self) -> Result<Arc<dyn AssetStore>, CreativeError>;

    /// Connect (and probe) the image model. Called once per run.
    async fn open_image_model(&self) -> Result<Arc<dyn ImageModel>, CreativeError>;

    fn text_model(&self) -> Option<Arc<dyn TextModel>>;
}

/// Connector backed by Gemini and Dropbox
pub struct LiveConnector {
    config: Arc<Config>,
}

impl LiveConnector {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for LiveConnector {
    async fn open_store(&self) -> Result<Arc<dyn AssetStore>, CreativeError> {
        let credentials = self
            .config
            .storage_credentials()
            .ok_or(CreativeError::StorageNotConfigured)?;
        let store = DropboxStore::connect(&credentials).await?;
        Ok(Arc::new(store))
    }

    async fn open_image_model(&self) -> Result<Arc<dyn ImageModel>, CreativeError> {
        let client = GeminiClient::image_client(&self.config)?.connect().await?;
        Ok(Arc::new(client))
    }

    fn text_model(&self) -> Option<Arc<dyn TextModel>> {
        match GeminiClient::text_client(&self.config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::error!("Could not initialize Gemini text model for alerts: {}", e);
                None
            }
        }
    }
}

/// Response body of a processed brief
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignOutcome {
    pub message: String,
    pub image_urls: Vec<String>,
}

#[derive(Clone)]
pub struct CampaignService {
    connector: Arc<dyn Connector>,
    output: OutputConfig,
}

impl CampaignService {
    pub fn new(connector: Arc<dyn Connector>, output: OutputConfig) -> Self {
        Self { connector, output }
    }

    pub async fn process_brief(
        &self,
        brief: CampaignBrief,
        uploads: Vec<ReferenceUpload>,
    ) -> Result<CampaignOutcome, CreativeError> {
        let safe_name = brief.safe_name()?;
        let folder = campaign_folder(&safe_name);

        let store = self.connector.open_store().await?;
        if store.folder_exists(&folder).await? {
            return Err(CreativeError::CampaignExists(brief.campaign_name.clone()));
        }

        let model = self.connector.open_image_model().await?;
        let pipeline = CreativePipeline::new(model.as_ref(), &self.output.staging_dir);
        let artifacts = pipeline.run(&brief, uploads).await?;

        let mut image_urls = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let remote_path = artifact.remote_path(&folder);
            match store.upload_file(&artifact.path, &remote_path).await {
                Ok(url) => {
                    tracing::info!("SUCCESS: Creative uploaded to Dropbox path: {}", remote_path);
                    image_urls.push(url);
                }
                Err(e) => {
                    tracing::error!(path = %remote_path, error = %e, "Upload failed; creative omitted");
                }
            }
            if let Err(e) = fs::remove_file(&artifact.path).await {
                tracing::warn!(path = %artifact.path.display(), error = %e, "Could not remove staged file");
            }
        }

        tracing::info!("Campaign pipeline completed.");

        tracing::info!("Running post-processing checks...");
        let reporter = Reporter::new(
            &self.output.logs_dir,
            &self.output.alerts_dir,
            self.connector.text_model(),
        );
        if let Err(e) = reporter.run_post_process_checks(&brief, &image_urls).await {
            tracing::error!("Post-processing checks failed: {}", e);
        }

        let message = if image_urls.is_empty() {
            "Brief processed, but no images were generated."
        } else {
            "Brief processed successfully."
        };
        Ok(CampaignOutcome {
            message: message.to_string(),
            image_urls,
        })
    }

    pub async fn list_campaigns(&self) -> Result<CampaignListing, CreativeError> {
        let store = self.connector.open_store().await?;
        store.list_campaign_assets().await
    }
}
