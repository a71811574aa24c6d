use crate::{
    error::Result,
    models::{ImageGenerationRequest, TextGenerationRequest},
};
use async_trait::async_trait;

/// A hosted model that turns an instruction prompt into free text.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_text(&self, request: TextGenerationRequest) -> Result<String>;
}

/// A hosted model that renders a prompt into encoded image bytes (any format
/// the `image` crate can decode).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_image(&self, request: ImageGenerationRequest) -> Result<Vec<u8>>;
}
