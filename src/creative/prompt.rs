use std::fmt::Write;

use super::reference::ReferenceImage;
use crate::core::CampaignBrief;

/// Build the generation instruction for one product.
///
/// Reference images are described in the order they are attached to the
/// request. The corner placement for logos is a hint to the model only.
pub fn assemble_prompt(
    brief: &CampaignBrief,
    product_name: &str,
    product_description: &str,
    references: &[ReferenceImage],
) -> String {
    let brand_colors = brief.brand_colors.join(", ");

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Generate a single, photorealistic ad creative for '{}' ({}).",
        product_name, product_description
    );
    prompt.push_str("**Creative Brief:**\n");
    let _ = writeln!(prompt, "- **Target Audience:** {}", brief.audience);
    let _ = write!(
        prompt,
        "- **Color Palette:** The image's color scheme MUST be inspired by these brand colors: {}.",
        brand_colors
    );

    if !references.is_empty() {
        prompt.push_str("\n\n**Base Image Instructions:**\n");
        for reference in references {
            let _ = writeln!(
                prompt,
                "- The image provided after this prompt is a '{}'. Integrate it into the final creative as a core element. If it's a logo, place it tastefully in a corner.",
                reference.description()
            );
        }
    }

    prompt.push_str("\n**Execution Requirements:**\n");
    let _ = writeln!(
        prompt,
        "1. **Text Overlay:** The text '{}' MUST be elegantly rendered directly onto the image.",
        brief.message
    );
    prompt.push_str(
        "2. **Aspect Ratio:** This is the most critical instruction. The final image's dimensions MUST strictly match the final, blank white placeholder image provided in the input. Do not deviate from its shape.\n",
    );

    prompt
}
