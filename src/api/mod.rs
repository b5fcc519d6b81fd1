mod types;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::DynamicImage;

pub use types::*;

use crate::config::Config;
use crate::core::{AspectRatio, CreativeError, GenerationFailure};
use crate::creative::{placeholder_image, ImageModel, ReferenceImage, TextModel};
use crate::http_client::HTTP_CLIENT;

/// Gemini API client bound to one model
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Client for the configured image model. Both the key and the model are required.
    pub fn image_client(config: &Config) -> Result<Self, CreativeError> {
        let api_key = config.api_key().ok_or(CreativeError::MissingApiKey)?;
        let model = config
            .image_model()
            .ok_or(CreativeError::MissingConfig("GEMINI_IMG_MODEL"))?;
        Ok(Self::new(api_key, &config.api.base_url, model))
    }

    /// Client for the text model used to write alerts
    pub fn text_client(config: &Config) -> Result<Self, CreativeError> {
        let api_key = config.api_key().ok_or(CreativeError::MissingApiKey)?;
        Ok(Self::new(api_key, &config.api.base_url, &config.api.text_model))
    }

    /// Make a trivial call so bad keys or model names fail before any real work
    pub async fn connect(self) -> Result<Self, CreativeError> {
        let request = GenerateRequest::user(vec![ContentPart::text("test")]);
        match self.generate_content(&request).await {
            Ok(_) => {
                tracing::info!(model = %self.model, "Connected to Gemini API");
                Ok(self)
            }
            Err(e) => Err(CreativeError::ProbeFailed {
                model: self.model.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// POST a generateContent request and parse the response
    pub async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, CreativeError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(
            "Sending generate request to: {} ({} parts)",
            url,
            request.contents.iter().map(|c| c.parts.len()).sum::<usize>()
        );

        let response = HTTP_CLIENT
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            let error: ApiErrorResponse = serde_json::from_str(&body)
                .unwrap_or_else(|_| ApiErrorResponse {
                    error: ApiError {
                        code: status.as_u16() as i32,
                        message: body.clone(),
                        status: status.to_string(),
                    },
                });
            return Err(CreativeError::api(format!(
                "{} ({} {})",
                error.error.message, error.error.code, error.error.status
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| CreativeError::api(format!("Failed to parse Gemini API response: {}", e)))
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        references: &[ReferenceImage],
    ) -> Result<DynamicImage, GenerationFailure> {
        // prompt, then references, then the blank canvas pinning the output shape
        let mut parts = Vec::with_capacity(references.len() + 2);
        parts.push(ContentPart::text(prompt));
        parts.extend(references.iter().map(|r| ContentPart::inline(r.inline_data().clone())));
        parts.push(ContentPart::inline(placeholder_image(aspect_ratio)?));

        let request = GenerateRequest::user(parts).with_modalities(&["TEXT", "IMAGE"]);
        let response = self.generate_content(&request).await?;

        let inline = classify_response(response)?;
        decode_inline_image(&inline)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, CreativeError> {
        let request = GenerateRequest::user(vec![ContentPart::text(prompt)]);
        let response = self.generate_content(&request).await?;
        response
            .text()
            .ok_or_else(|| CreativeError::api("Model returned no text"))
    }
}

/// Decide what a generateContent response amounts to, in a fixed order:
/// no candidates (or a candidate with no parts) means blocked, then the
/// first inline image wins, otherwise the model answered in text.
pub fn classify_response(response: GenerateResponse) -> Result<InlineData, GenerationFailure> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let Some(candidate) = response.candidates.and_then(|c| c.into_iter().next()) else {
        return Err(GenerationFailure::Blocked {
            reason: block_reason.unwrap_or_else(|| "Unknown".to_string()),
        });
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    if parts.is_empty() {
        // An extra blocked case on top of "no candidates": Gemini drops the
        // content entirely when the output image itself is filtered
        return Err(GenerationFailure::Blocked {
            reason: candidate
                .finish_reason
                .or(block_reason)
                .unwrap_or_else(|| "Unknown".to_string()),
        });
    }

    let mut texts = Vec::new();
    for part in parts {
        match part {
            ContentPart::InlineData { inline_data } => return Ok(inline_data),
            ContentPart::Text { text } => texts.push(text),
            ContentPart::Other(value) => tracing::debug!("Skipping unsupported response part: {}", value),
        }
    }

    Err(GenerationFailure::TextOnly {
        text: texts.join(" ").trim().to_string(),
    })
}

/// Decode base64 inline data into an image
pub fn decode_inline_image(inline: &InlineData) -> Result<DynamicImage, GenerationFailure> {
    let bytes = BASE64
        .decode(&inline.data)
        .map_err(|e| GenerationFailure::generation(format!("Failed to decode base64 image: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| GenerationFailure::generation(format!("Failed to decode generated image: {}", e)))
}
