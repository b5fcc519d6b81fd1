use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

use crate::api::InlineData;
use crate::core::{AspectRatio, CreativeError};

/// Raw reference image as received from the caller
#[derive(Debug, Clone)]
pub struct ReferenceUpload {
    pub bytes: Vec<u8>,
    /// Role of the image in the creative, e.g. "brand logo"
    pub description: String,
}

impl ReferenceUpload {
    pub fn new(bytes: Vec<u8>, description: impl Into<String>) -> Self {
        Self {
            bytes,
            description: description.into(),
        }
    }
}

/// A reference image decoded once and shared read-only by every cell of a run.
/// Only the re-encoded PNG is kept; the raw upload is gone after `decode`.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    description: String,
    inline: InlineData,
}

impl ReferenceImage {
    /// Decode an upload. Consumes it so the raw bytes cannot be read twice.
    pub fn decode(upload: ReferenceUpload) -> Result<Self, CreativeError> {
        let image = image::load_from_memory(&upload.bytes)?;
        Ok(Self {
            description: upload.description,
            inline: encode_png(&image)?,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// PNG payload sent to the model
    pub fn inline_data(&self) -> &InlineData {
        &self.inline
    }
}

/// Decode every upload up front, dropping (and logging) the ones that fail
pub fn prepare_references(uploads: Vec<ReferenceUpload>) -> Vec<ReferenceImage> {
    let mut prepared = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let description = upload.description.clone();
        tracing::info!("Preparing base image ('{}')...", description);
        match ReferenceImage::decode(upload) {
            Ok(reference) => prepared.push(reference),
            Err(e) => {
                tracing::warn!(
                    description = %description,
                    error = %e,
                    "Could not process uploaded reference image; skipping it"
                );
            }
        }
    }
    prepared
}

/// Encode an image as base64 PNG inline data
pub fn encode_png(image: &DynamicImage) -> Result<InlineData, CreativeError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(InlineData {
        mime_type: "image/png".to_string(),
        data: BASE64.encode(&bytes),
    })
}

/// Blank white canvas with the target dimensions of `aspect_ratio`
pub fn placeholder_image(aspect_ratio: AspectRatio) -> Result<InlineData, CreativeError> {
    let (width, height) = aspect_ratio.dimensions();
    let canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    encode_png(&DynamicImage::ImageRgb8(canvas))
}
