//! Image pipeline: credential check, generation, download, decode and save.
//!
//! Each step fails with its own [`ImageError`] variant. Nothing is written to
//! disk until the downloaded bytes have decoded and re-encoded successfully,
//! so a failed run never leaves a partial file behind.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deck_core::DeckConfig;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, error, info};

use super::openai_images::OpenAiImageTransport;
use super::{DEFAULT_IMAGE_MODEL, ImageError, ImageRequest, ImageTransport};

/// Resolves a credential by environment variable name.
pub type CredentialLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

const PROMPT_LOG_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct ImagePipeline<T: ImageTransport> {
    transport: T,
    api_key_env: String,
    model: String,
    lookup: CredentialLookup,
}

impl<T: ImageTransport> ImagePipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            api_key_env: deck_core::DEFAULT_API_KEY_ENV.into(),
            model: DEFAULT_IMAGE_MODEL.into(),
            lookup: Arc::new(|name: &str| std::env::var(name).ok()),
        }
    }

    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the environment lookup, e.g. with a fixed map in tests.
    pub fn with_credential_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate an image for `prompt` and save it at `output_path`.
    ///
    /// The file format follows the output extension. Missing parent
    /// directories are created. Returns the path written.
    pub async fn generate_and_save_image(
        &self,
        prompt: &str,
        output_path: impl AsRef<Path>,
    ) -> Result<PathBuf, ImageError> {
        let output_path = output_path.as_ref();

        let api_key = (self.lookup)(self.api_key_env.as_str())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                error!(env = self.api_key_env.as_str(), "Image API key not configured");
                ImageError::MissingCredential(self.api_key_env.clone())
            })?;

        info!(
            provider = self.transport.name(),
            prompt = %truncate_prompt(prompt),
            "Generating image"
        );

        let request = ImageRequest::new(prompt).with_model(self.model.as_str());
        let url = self
            .transport
            .generate(&api_key, &request)
            .await
            .inspect_err(|e| error!("Image generation failed: {e}"))?;

        debug!(url = url.as_str(), "Downloading generated image");
        let download = self
            .transport
            .download(&url)
            .await
            .inspect_err(|e| error!("Image download failed: {e}"))?;

        if download.status != 200 {
            error!(status = download.status, "Image download returned non-OK status");
            return Err(ImageError::Download(download.status));
        }

        save_image(&download.bytes, output_path)
            .inspect_err(|e| error!("Saving image failed: {e}"))?;

        info!(path = %output_path.display(), "Image saved");
        Ok(output_path.to_path_buf())
    }

    /// Blocking form of [`generate_and_save_image`](Self::generate_and_save_image).
    ///
    /// Runs the same steps on a private current-thread runtime, so it must
    /// not be called from inside an async context.
    pub fn generate_and_save_image_blocking(
        &self,
        prompt: &str,
        output_path: impl AsRef<Path>,
    ) -> Result<PathBuf, ImageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ImageError::Network(format!("failed to start runtime: {e}")))?;
        runtime.block_on(self.generate_and_save_image(prompt, output_path))
    }
}

impl ImagePipeline<OpenAiImageTransport> {
    /// Build the OpenAI-backed pipeline from application config.
    pub fn from_config(config: &DeckConfig) -> Self {
        let timeout = config.request_timeout_secs.map(Duration::from_secs);
        let transport = OpenAiImageTransport::with_base_url(config.openai_base_url.clone(), timeout);
        Self::new(transport)
            .with_api_key_env(config.api_key_env.as_str())
            .with_model(config.image_model.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn truncate_prompt(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_LOG_CHARS {
        prompt.to_string()
    } else {
        let head: String = prompt.chars().take(PROMPT_LOG_CHARS).collect();
        format!("{head}...")
    }
}

/// Decode `bytes` and write them to `path` in the format its extension names.
fn save_image(bytes: &[u8], path: &Path) -> Result<(), ImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
    let format = ImageFormat::from_path(path).map_err(|e| ImageError::Decode(e.to_string()))?;

    // JPEG has no alpha channel.
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let mut encoded = Vec::new();
    img.write_to(&mut Cursor::new(&mut encoded), format)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ImageError::Filesystem {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    std::fs::write(path, &encoded).map_err(|e| ImageError::Filesystem {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
