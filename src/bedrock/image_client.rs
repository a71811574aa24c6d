use crate::{
    error::{PostGenError, Result},
    models::{ImageGenerationRequest, StabilityImageResponse, TitanImageResponse},
    providers::ImageProvider,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{primitives::Blob, Client};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

const DEFAULT_IMAGE_MODEL: &str = "amazon.titan-image-generator-v1";

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    default_model: String,
}

impl ImageClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            default_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model_id: impl Into<String>) -> Self {
        self.default_model = model_id.into();
        self
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("amazon.titan-image-generator-v1", "Titan Image Generator", "Amazon"),
            ("stability.stable-diffusion-xl-v1", "Stable Diffusion XL", "Stability AI"),
        ]
    }

    fn build_request_payload(request: &ImageGenerationRequest, model_id: &str) -> Result<Value> {
        let width = request.width.unwrap_or(1024);
        let height = request.height.unwrap_or(1024);

        match model_id {
            id if id.starts_with("amazon.titan-image") => Ok(json!({
                "taskType": "TEXT_IMAGE",
                "textToImageParams": {
                    "text": request.prompt
                },
                "imageGenerationConfig": {
                    "numberOfImages": 1,
                    "width": width,
                    "height": height,
                    "quality": "standard",
                    "cfgScale": 8.0
                }
            })),
            id if id.starts_with("stability.") => Ok(json!({
                "text_prompts": [{ "text": request.prompt }],
                "width": width,
                "height": height,
                "cfg_scale": 7,
                "steps": 30
            })),
            _ => Err(PostGenError::RequestError(format!(
                "Unsupported image model: {}",
                model_id
            ))),
        }
    }

    fn parse_response(body: &[u8], model_id: &str) -> Result<Vec<u8>> {
        let encoded = if model_id.starts_with("stability.") {
            let stability: StabilityImageResponse = serde_json::from_slice(body)
                .map_err(|e| PostGenError::ResponseError(e.to_string()))?;
            stability.artifacts.into_iter().next().map(|a| a.base64)
        } else {
            let titan: TitanImageResponse = serde_json::from_slice(body)
                .map_err(|e| PostGenError::ResponseError(e.to_string()))?;
            titan.images.into_iter().next()
        };

        let encoded =
            encoded.ok_or_else(|| PostGenError::ResponseError("No images generated".into()))?;

        STANDARD
            .decode(encoded)
            .map_err(|e| PostGenError::ResponseError(format!("Invalid base64 image: {}", e)))
    }
}

#[async_trait]
impl ImageProvider for ImageClient {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn generate_image(&self, request: ImageGenerationRequest) -> Result<Vec<u8>> {
        let model_id = request
            .model_id
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let request_json = serde_json::to_string(&Self::build_request_payload(&request, &model_id)?)
            .map_err(|e| PostGenError::SerializationError(e.to_string()))?;

        log::info!("Generating image with model: {}", model_id);

        let response = self
            .client
            .invoke_model()
            .model_id(&model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(|e| PostGenError::AwsError(e.to_string()))?;

        Self::parse_response(&response.body.into_inner(), &model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titan_response_decodes() {
        let body = format!(r#"{{"images":["{}"]}}"#, STANDARD.encode(b"png-bytes"));
        let bytes =
            ImageClient::parse_response(body.as_bytes(), "amazon.titan-image-generator-v1")
                .unwrap();
        assert_eq!(bytes, b"png-bytes");
    }

    #[test]
    fn test_empty_titan_response_is_error() {
        assert!(ImageClient::parse_response(
            br#"{"images":[]}"#,
            "amazon.titan-image-generator-v1"
        )
        .is_err());
    }

    #[test]
    fn test_stability_payload() {
        let request = ImageGenerationRequest::new("desk").with_size(512, 512);
        let payload =
            ImageClient::build_request_payload(&request, "stability.stable-diffusion-xl-v1")
                .unwrap();
        assert_eq!(payload["text_prompts"][0]["text"], "desk");
        assert_eq!(payload["width"], 512);
    }
}
