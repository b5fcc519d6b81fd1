use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::aspect::AspectRatio;
use super::error::CreativeError;

/// A campaign brief as submitted by the marketing team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBrief {
    pub campaign_name: String,
    pub region: String,
    pub audience: String,
    /// Text rendered onto every creative
    pub message: String,
    pub brand_colors: Vec<String>,
    pub products: Products,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub description: String,
}

/// Products keyed by name, kept in the order the brief declares them.
///
/// Deserializes from a JSON object; duplicate names are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Products(Vec<(String, ProductDetails)>);

impl Products {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProductDetails)> {
        self.0.iter().map(|(name, details)| (name.as_str(), details))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Serialize for Products {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, details) in &self.0 {
            map.serialize_entry(name, details)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Products {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProductsVisitor;

        impl<'de> Visitor<'de> for ProductsVisitor {
            type Value = Products;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of product name to product details")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Products, A::Error> {
                let mut entries: Vec<(String, ProductDetails)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, details)) = access.next_entry::<String, ProductDetails>()? {
                    if entries.iter().any(|(existing, _)| *existing == name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate product '{}'",
                            name
                        )));
                    }
                    entries.push((name, details));
                }
                Ok(Products(entries))
            }
        }

        deserializer.deserialize_map(ProductsVisitor)
    }
}

impl CampaignBrief {
    /// Parse and validate a JSON-encoded brief
    pub fn from_json(data: &str) -> Result<Self, CreativeError> {
        let brief: CampaignBrief =
            serde_json::from_str(data).map_err(|e| CreativeError::InvalidBrief(e.to_string()))?;

        if brief.products.is_empty() {
            return Err(CreativeError::InvalidBrief(
                "brief must list at least one product".to_string(),
            ));
        }

        Ok(brief)
    }

    /// Filesystem and storage safe form of the campaign name
    pub fn safe_name(&self) -> Result<String, CreativeError> {
        let name = sanitize_name(&self.campaign_name);
        if name.is_empty() {
            return Err(CreativeError::InvalidCampaignName);
        }
        Ok(name)
    }

    /// Number of creatives a fully successful run produces
    pub fn expected_creatives(&self) -> usize {
        self.products.len() * AspectRatio::ALL.len()
    }
}

/// Reduce a free-form name to word characters, `-` and `.`, with spaces
/// turned into underscores. Leading and trailing dots are dropped so the
/// result can never be `.` or `..`.
pub fn sanitize_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
        .collect();

    kept.trim_matches(|c: char| c == ' ' || c == '.')
        .replace(' ', "_")
}
