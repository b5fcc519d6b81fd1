use async_trait::async_trait;
use image::DynamicImage;

use super::reference::ReferenceImage;
use crate::core::{AspectRatio, CreativeError, GenerationFailure};

/// A multimodal model that turns a prompt plus reference images into one image.
///
/// Implementations must classify every failure; nothing else escapes.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        references: &[ReferenceImage],
    ) -> Result<DynamicImage, GenerationFailure>;
}

/// Plain text completion, used for alert emails
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, CreativeError>;
}
