use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::aspect::AspectRatio;
use super::brief::sanitize_name;

/// A creative written to the local staging directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    /// Product the creative was generated for
    pub product: String,
    pub aspect_ratio: AspectRatio,
    /// Full path of the staged file
    pub path: PathBuf,
    /// Unique filename, also used as the remote object name
    pub filename: String,
}

impl GeneratedArtifact {
    /// Build a staged artifact with a fresh `<campaign>_<product>_<WxH>_<id>.png` filename
    pub fn stage(
        staging_dir: &Path,
        campaign: &str,
        product: &str,
        aspect_ratio: AspectRatio,
    ) -> Self {
        let filename = artifact_filename(campaign, product, aspect_ratio);
        Self {
            product: product.to_string(),
            aspect_ratio,
            path: staging_dir.join(&filename),
            filename,
        }
    }

    /// Destination inside a campaign namespace, e.g. `/Spring/9:16/Spring_Soda_9x16_1a2b3c4d.png`
    pub fn remote_path(&self, campaign_folder: &str) -> String {
        format!(
            "{}/{}/{}",
            campaign_folder.trim_end_matches('/'),
            self.aspect_ratio.as_str(),
            self.filename
        )
    }
}

fn artifact_filename(campaign: &str, product: &str, aspect_ratio: AspectRatio) -> String {
    let uuid = Uuid::new_v4();
    let mut product = sanitize_name(product);
    if product.is_empty() {
        product = "product".to_string();
    }
    format!(
        "{}_{}_{}_{}.png",
        campaign,
        product,
        aspect_ratio.file_token(),
        &uuid.simple().to_string()[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_embeds_campaign_product_and_ratio() {
        let artifact = GeneratedArtifact::stage(
            Path::new("temp_outputs"),
            "Summer_Sale",
            "Zesty Soda",
            AspectRatio::Portrait,
        );
        assert!(artifact.filename.starts_with("Summer_Sale_Zesty_Soda_9x16_"));
        assert!(artifact.filename.ends_with(".png"));
        // "<prefix>_" + 8 hex chars + ".png"
        assert_eq!(
            artifact.filename.len(),
            "Summer_Sale_Zesty_Soda_9x16_".len() + 8 + 4
        );
        assert_eq!(artifact.path, Path::new("temp_outputs").join(&artifact.filename));
    }

    #[test]
    fn filenames_are_unique_per_cell() {
        let dir = Path::new("out");
        let a = GeneratedArtifact::stage(dir, "C", "P", AspectRatio::Square);
        let b = GeneratedArtifact::stage(dir, "C", "P", AspectRatio::Square);
        assert_ne!(a.filename, b.filename);
    }

    #[test]
    fn remote_path_groups_by_ratio() {
        let artifact = GeneratedArtifact::stage(Path::new("."), "Spring", "Tea", AspectRatio::Landscape);
        let remote = artifact.remote_path("/Spring");
        assert_eq!(remote, format!("/Spring/16:9/{}", artifact.filename));
    }
}
