use crate::{
    config::GeminiConfig,
    error::{PostGenError, Result},
    models::{GeminiResponse, TextGenerationRequest},
    providers::traits::TextProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PostGenError::ConfigError("Gemini API key is required".into()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.post_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_payload(request: &TextGenerationRequest) -> Value {
        let mut generation_config = Map::new();
        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }

        let mut payload = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": request.prompt }]
                }
            ]
        });
        if !generation_config.is_empty() {
            payload["generationConfig"] = Value::Object(generation_config);
        }
        payload
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_text(&self, request: TextGenerationRequest) -> Result<String> {
        let model = request.model_id.as_deref().unwrap_or(&self.default_model);
        let url = self.endpoint(model);

        log::info!("Invoking Gemini model: {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_payload(&request))
            .send()
            .await
            .map_err(|e| PostGenError::RequestError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("Gemini generateContent", response).await);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PostGenError::ResponseError(e.to_string()))?;

        if let Some(reason) = parsed
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            log::debug!("Gemini finish reason: {}", reason);
        }

        parsed
            .text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| PostGenError::ResponseError("Gemini returned no text".into()))
    }
}
