pub mod images;

pub use images::openai_images::OpenAiImageTransport;
pub use images::pipeline::{CredentialLookup, ImagePipeline};
pub use images::{Download, IMAGE_SIZE, ImageError, ImageRequest, ImageTransport};
