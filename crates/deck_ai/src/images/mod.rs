//! Prompt-to-image generation: transport trait, shared types and the
//! generate/download/save pipeline.
//!
//! Follows the same async-trait provider pattern as the rest of `deck_ai`.
//! A backend implements [`ImageTransport`]; [`pipeline::ImagePipeline`] runs
//! the steps and owns every success/failure decision, so fake transports in
//! tests exercise exactly the production logic.

pub mod openai_images;
pub mod pipeline;

use std::path::PathBuf;

use async_trait::async_trait;

/// Resolution requested for every generated image.
pub const IMAGE_SIZE: &str = "1024x1024";

/// Text-to-image model used unless configured otherwise.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Everything that can stop an image from reaching disk.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("{0} environment variable not set")]
    MissingCredential(String),

    #[error("Failed to generate image: {0}")]
    Generation(String),

    #[error("Failed to download generated image: HTTP {0}")]
    Download(u16),

    #[error("Network error downloading image: {0}")]
    Network(String),

    #[error("Failed to save image to {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },

    #[error("Error processing image: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Request sent to the image-generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub count: u32,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_IMAGE_MODEL.into(),
            size: IMAGE_SIZE.into(),
            count: 1,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Raw result of fetching an image URL. Whether the status is acceptable is
/// the pipeline's call, not the transport's.
#[derive(Debug, Clone)]
pub struct Download {
    pub status: u16,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Network capability the pipeline needs: one generation call and one GET.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Human-readable display name.
    fn name(&self) -> &str;

    /// Ask the provider for an image and return the URL it is served from.
    async fn generate(&self, api_key: &str, request: &ImageRequest) -> Result<String, ImageError>;

    /// Fetch `url`. Non-success statuses come back as a [`Download`], only
    /// transport failures are errors.
    async fn download(&self, url: &str) -> Result<Download, ImageError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
