pub mod gemini;
pub mod huggingface;
pub mod traits;

use crate::{
    bedrock::BedrockClient,
    config::{Config, ImageBackend, TextBackend},
    error::Result,
};
use std::sync::Arc;

pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use traits::{ImageProvider, TextProvider};

/// The text and image backends selected by configuration, plus the model ids
/// each generation stage should ask for.
#[derive(Clone)]
pub struct ProviderSet {
    pub text: Arc<dyn TextProvider>,
    pub image: Arc<dyn ImageProvider>,
    pub post_model: Option<String>,
    pub image_prompt_model: Option<String>,
}

impl ProviderSet {
    pub fn new(text: Arc<dyn TextProvider>, image: Arc<dyn ImageProvider>) -> Self {
        Self {
            text,
            image,
            post_model: None,
            image_prompt_model: None,
        }
    }

    pub fn with_models(
        mut self,
        post_model: Option<String>,
        image_prompt_model: Option<String>,
    ) -> Self {
        self.post_model = post_model;
        self.image_prompt_model = image_prompt_model;
        self
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let needs_bedrock = config.text_backend == TextBackend::Bedrock
            || config.image_backend == ImageBackend::Bedrock;
        let bedrock = if needs_bedrock {
            Some(BedrockClient::new(config.bedrock.clone()).await?)
        } else {
            None
        };

        let (text, post_model, image_prompt_model) = match (config.text_backend, &bedrock) {
            (TextBackend::Bedrock, Some(client)) => {
                let text: Arc<dyn TextProvider> = Arc::new(client.text().clone());
                (text, None, None)
            }
            _ => {
                let text: Arc<dyn TextProvider> = Arc::new(GeminiProvider::new(&config.gemini)?);
                (
                    text,
                    Some(config.gemini.post_model.clone()),
                    Some(config.gemini.image_prompt_model.clone()),
                )
            }
        };

        let image: Arc<dyn ImageProvider> = match (config.image_backend, &bedrock) {
            (ImageBackend::Bedrock, Some(client)) => Arc::new(client.image().clone()),
            _ => Arc::new(HuggingFaceProvider::new(&config.huggingface)?),
        };

        log::info!(
            "Providers ready: text={} image={}",
            text.name(),
            image.name()
        );

        Ok(Self::new(text, image).with_models(post_model, image_prompt_model))
    }
}
