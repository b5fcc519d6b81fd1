pub mod artifact;
pub mod aspect;
pub mod brief;
pub mod error;

pub use artifact::GeneratedArtifact;
pub use aspect::AspectRatio;
pub use brief::{sanitize_name, CampaignBrief};
pub use error::{CreativeError, GenerationFailure};
