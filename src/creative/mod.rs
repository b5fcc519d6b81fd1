//! Creative generation: prompt assembly, reference images, and the
//! product x aspect-ratio pipeline.

mod model;
mod pipeline;
mod prompt;
mod reference;

pub use model::{ImageModel, TextModel};
pub use pipeline::CreativePipeline;
pub use reference::{placeholder_image, ReferenceImage, ReferenceUpload};
