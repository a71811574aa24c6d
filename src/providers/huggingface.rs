use crate::{
    config::HuggingFaceConfig,
    error::{PostGenError, Result},
    models::ImageGenerationRequest,
    providers::traits::ImageProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Text-to-image through the Hugging Face Inference API. The answer body is
/// the raw encoded image.
pub struct HuggingFaceProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl HuggingFaceProvider {
    pub fn new(config: &HuggingFaceConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PostGenError::ConfigError("Hugging Face API key is required".into())
        })?;

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.model.clone(),
        })
    }

    fn build_headers(&self) -> Result<reqwest::header::HeaderMap> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = format!("Bearer {}", self.api_key)
            .parse()
            .map_err(|_| PostGenError::ConfigError("Invalid Hugging Face API key".into()))?;
        headers.insert(reqwest::header::AUTHORIZATION, bearer);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("image/png"),
        );
        Ok(headers)
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn generate_image(&self, request: ImageGenerationRequest) -> Result<Vec<u8>> {
        let model = request.model_id.as_deref().unwrap_or(&self.default_model);
        let url = format!("{}/models/{}", self.base_url, model);

        let mut payload = json!({ "inputs": request.prompt });
        if let (Some(width), Some(height)) = (request.width, request.height) {
            payload["parameters"] = json!({ "width": width, "height": height });
        }

        log::info!("Generating image with model: {}", model);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                PostGenError::RequestError(format!("Hugging Face request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("Hugging Face text-to-image", response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PostGenError::ResponseError(e.to_string()))?;

        if bytes.is_empty() {
            return Err(PostGenError::ResponseError("No image generated".into()));
        }

        Ok(bytes.to_vec())
    }
}
