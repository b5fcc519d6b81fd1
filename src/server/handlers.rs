use axum::{
    extract::{Multipart, State},
    Json,
};

use super::AppState;
use crate::campaign::CampaignOutcome;
use crate::core::{CampaignBrief, CreativeError};
use crate::creative::ReferenceUpload;
use crate::storage::CampaignListing;

/// Fields of the `/process-brief` form
#[derive(Debug, Default)]
struct BriefForm {
    brief_data: Option<String>,
    images: [Option<Vec<u8>>; 2],
    descriptions: [Option<String>; 2],
}

impl BriefForm {
    async fn read(mut multipart: Multipart) -> Result<Self, CreativeError> {
        let mut form = BriefForm::default();

        while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "brief_data" => form.brief_data = Some(field.text().await.map_err(invalid_form)?),
                "base_image_1" | "base_image_2" => {
                    let bytes = field.bytes().await.map_err(invalid_form)?;
                    // browsers send an empty part when no file was picked
                    if !bytes.is_empty() {
                        form.images[slot(&name)] = Some(bytes.to_vec());
                    }
                }
                "base_image_desc_1" | "base_image_desc_2" => {
                    let text = field.text().await.map_err(invalid_form)?;
                    if !text.trim().is_empty() {
                        form.descriptions[slot(&name)] = Some(text);
                    }
                }
                other => tracing::debug!("Ignoring unknown form field '{}'", other),
            }
        }

        Ok(form)
    }

    /// Reference images that came with both a file and a description
    fn references(&mut self) -> Vec<ReferenceUpload> {
        self.images
            .iter_mut()
            .zip(self.descriptions.iter_mut())
            .filter_map(|(image, description)| match (image.take(), description.take()) {
                (Some(bytes), Some(description)) => Some(ReferenceUpload::new(bytes, description)),
                _ => None,
            })
            .collect()
    }
}

fn slot(name: &str) -> usize {
    if name.ends_with('2') {
        1
    } else {
        0
    }
}

fn invalid_form(err: axum::extract::multipart::MultipartError) -> CreativeError {
    CreativeError::InvalidBrief(err.to_string())
}

pub async fn process_brief(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CampaignOutcome>, CreativeError> {
    tracing::info!("New campaign request received. Starting pipeline...");

    let mut form = BriefForm::read(multipart).await?;
    let brief_data = form
        .brief_data
        .take()
        .ok_or_else(|| CreativeError::InvalidBrief("missing brief_data field".to_string()))?;
    let brief = CampaignBrief::from_json(&brief_data)?;

    let outcome = state.service.process_brief(brief, form.references()).await?;
    Ok(Json(outcome))
}

pub async fn list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<CampaignListing>, CreativeError> {
    tracing::info!("API request received to list all campaigns.");
    let campaigns = state.service.list_campaigns().await?;
    Ok(Json(campaigns))
}
