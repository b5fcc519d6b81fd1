use thiserror::Error;

#[derive(Error, Debug)]
pub enum CreativeError {
    #[error("API key not configured. Set GOOGLE_API_KEY (or GEMINI_API_KEY) or run: forge config set api.key <your-key>")]
    MissingApiKey,

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid brief format: {0}")]
    InvalidBrief(String),

    #[error("Campaign name is invalid or empty.")]
    InvalidCampaignName,

    #[error("A campaign named '{0}' already exists. Please use a unique name.")]
    CampaignExists(String),

    #[error("API connection failed for model '{model}': {message}")]
    ProbeFailed { model: String, message: String },

    #[error("Dropbox environment variables are not configured.")]
    StorageNotConfigured,

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CreativeError {
    pub fn storage(message: impl Into<String>) -> Self {
        CreativeError::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        CreativeError::Api {
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for CreativeError {
    fn from(err: reqwest::Error) -> Self {
        CreativeError::Api {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<image::ImageError> for CreativeError {
    fn from(err: image::ImageError) -> Self {
        CreativeError::Image(err.to_string())
    }
}

/// Why a single (product, aspect ratio) cell produced no image.
///
/// These never abort a run; the pipeline logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("Request was blocked by the model's safety filters (reason: {reason})")]
    Blocked { reason: String },

    #[error("Model returned text instead of an image: '{text}'")]
    TextOnly { text: String },

    #[error("Image generation error: {message}")]
    Generation { message: String },
}

impl GenerationFailure {
    pub fn generation(message: impl Into<String>) -> Self {
        GenerationFailure::Generation {
            message: message.into(),
        }
    }

    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationFailure::Blocked { .. } => "blocked",
            GenerationFailure::TextOnly { .. } => "text_only",
            GenerationFailure::Generation { .. } => "generation_error",
        }
    }
}

impl From<CreativeError> for GenerationFailure {
    fn from(err: CreativeError) -> Self {
        GenerationFailure::generation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_the_campaign() {
        let err = CreativeError::CampaignExists("Summer Sale".into());
        assert!(err.to_string().contains("'Summer Sale' already exists"));
    }

    #[test]
    fn creative_errors_wrap_into_generation_failures() {
        let failure: GenerationFailure = CreativeError::api("connection reset").into();
        assert_eq!(failure.kind(), "generation_error");
        assert!(failure.to_string().contains("connection reset"));
    }
}
