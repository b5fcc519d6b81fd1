use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::model::ImageModel;
use super::prompt::assemble_prompt;
use super::reference::{prepare_references, ReferenceImage, ReferenceUpload};
use crate::core::{AspectRatio, CampaignBrief, CreativeError, GeneratedArtifact};

/// Walks the product x aspect-ratio matrix for one campaign run.
///
/// Cells run one after another in brief order, then square, portrait,
/// landscape. A failed cell is logged and skipped; it is never retried.
pub struct CreativePipeline<'a> {
    model: &'a dyn ImageModel,
    staging_dir: PathBuf,
}

impl<'a> CreativePipeline<'a> {
    pub fn new(model: &'a dyn ImageModel, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            staging_dir: staging_dir.into(),
        }
    }

    /// Generate every cell and return the staged artifacts in iteration order.
    ///
    /// Only setup problems (bad campaign name, unwritable staging dir) are errors.
    pub async fn run(
        &self,
        brief: &CampaignBrief,
        uploads: Vec<ReferenceUpload>,
    ) -> Result<Vec<GeneratedArtifact>, CreativeError> {
        let campaign = brief.safe_name()?;
        fs::create_dir_all(&self.staging_dir).await?;

        let references = prepare_references(uploads);
        Ok(self.run_cells(brief, &campaign, &references).await)
    }

    async fn run_cells(
        &self,
        brief: &CampaignBrief,
        campaign: &str,
        references: &[ReferenceImage],
    ) -> Vec<GeneratedArtifact> {
        let mut artifacts = Vec::with_capacity(brief.expected_creatives());

        for (product, details) in brief.products.iter() {
            let prompt = assemble_prompt(brief, product, &details.description, references);

            for aspect_ratio in AspectRatio::ALL {
                tracing::info!("--- Starting generation for '{}' ({}) ---", product, aspect_ratio);

                let image = match self.model.generate(&prompt, aspect_ratio, references).await {
                    Ok(image) => image,
                    Err(failure) => {
                        tracing::warn!(
                            product = %product,
                            aspect_ratio = %aspect_ratio,
                            kind = failure.kind(),
                            "Skipping creative: {}",
                            failure
                        );
                        continue;
                    }
                };

                let artifact =
                    GeneratedArtifact::stage(&self.staging_dir, campaign, product, aspect_ratio);
                match save_png(&image, &artifact.path).await {
                    Ok(()) => {
                        tracing::info!(path = %artifact.path.display(), "Creative staged");
                        artifacts.push(artifact);
                    }
                    Err(e) => {
                        tracing::error!(
                            product = %product,
                            aspect_ratio = %aspect_ratio,
                            error = %e,
                            "Failed to save generated creative"
                        );
                    }
                }
            }
        }

        artifacts
    }
}

async fn save_png(image: &DynamicImage, path: &Path) -> Result<(), CreativeError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    fs::write(path, &bytes).await?;
    Ok(())
}
