use crate::{
    bedrock::ModelProvider,
    error::{PostGenError, Result},
    models::{LlamaResponse, TextGenerationRequest, TitanTextResponse},
    providers::TextProvider,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{error::ProvideErrorMetadata, primitives::Blob, Client};
use serde_json::{json, Value};

const DEFAULT_TEXT_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

#[derive(Clone)]
pub struct TextClient {
    client: Client,
    default_model: String,
}

impl TextClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            default_model: DEFAULT_TEXT_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model_id: impl Into<String>) -> Self {
        self.default_model = model_id.into();
        self
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("amazon.titan-text-express-v1", "Titan Text Express", "Amazon"),
            ("anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku", "Anthropic"),
            ("anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet", "Anthropic"),
            ("meta.llama3-8b-instruct-v1:0", "Llama 3 8B Instruct", "Meta"),
            ("mistral.mistral-7b-instruct-v0:2", "Mistral 7B Instruct", "Mistral"),
            ("cohere.command-text-v14", "Command", "Cohere"),
        ]
    }

    fn provider_for(model_id: &str) -> Result<ModelProvider> {
        ModelProvider::from_model_id(model_id).ok_or_else(|| {
            PostGenError::RequestError(format!("Unsupported model ID: {}", model_id))
        })
    }

    fn build_request_payload(request: &TextGenerationRequest, model_id: &str) -> Result<Value> {
        let max_tokens = request.max_tokens.unwrap_or(1024);
        let temperature = request.temperature.unwrap_or(0.7);

        let payload = match Self::provider_for(model_id)? {
            ModelProvider::Amazon => json!({
                "inputText": request.prompt,
                "textGenerationConfig": {
                    "maxTokenCount": max_tokens,
                    "temperature": temperature,
                    "topP": 0.9
                }
            }),
            ModelProvider::Anthropic => json!({
                "messages": [
                    {
                        "role": "user",
                        "content": request.prompt
                    }
                ],
                "max_tokens": max_tokens,
                "temperature": temperature,
                "anthropic_version": "bedrock-2023-05-31"
            }),
            ModelProvider::Meta => json!({
                "prompt": request.prompt,
                "max_gen_len": max_tokens,
                "temperature": temperature,
                "top_p": 0.9
            }),
            ModelProvider::Mistral => json!({
                "prompt": request.prompt,
                "max_tokens": max_tokens,
                "temperature": temperature,
                "top_p": 0.9
            }),
            ModelProvider::Cohere => json!({
                "prompt": request.prompt,
                "max_tokens": max_tokens,
                "temperature": temperature,
                "p": 0.9
            }),
            ModelProvider::AI21 => json!({
                "prompt": request.prompt,
                "maxTokens": max_tokens,
                "temperature": temperature,
                "topP": 0.9
            }),
        };

        Ok(payload)
    }

    fn parse_response(body: &[u8], model_id: &str) -> Result<String> {
        let provider = Self::provider_for(model_id)?;
        let text = match provider {
            ModelProvider::Amazon => {
                let titan: TitanTextResponse = serde_json::from_slice(body)
                    .map_err(|e| PostGenError::ResponseError(e.to_string()))?;
                titan.results.into_iter().next().map(|r| r.output_text)
            }
            ModelProvider::Meta => {
                let llama: LlamaResponse = serde_json::from_slice(body)
                    .map_err(|e| PostGenError::ResponseError(e.to_string()))?;
                Some(llama.generation)
            }
            _ => {
                let json: Value = serde_json::from_slice(body)
                    .map_err(|e| PostGenError::ResponseError(e.to_string()))?;
                let pointer = match provider {
                    ModelProvider::Anthropic => "/content/0/text",
                    ModelProvider::Mistral => "/outputs/0/text",
                    ModelProvider::Cohere => "/generations/0/text",
                    _ => "/completions/0/data/text",
                };
                json.pointer(pointer).and_then(Value::as_str).map(String::from)
            }
        };

        text.ok_or_else(|| {
            PostGenError::ResponseError(format!("No text in {:?} response", provider))
        })
    }
}

#[async_trait]
impl TextProvider for TextClient {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn generate_text(&self, request: TextGenerationRequest) -> Result<String> {
        let model_id = request
            .model_id
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let request_payload = Self::build_request_payload(&request, &model_id)?;
        let request_json = serde_json::to_string(&request_payload)
            .map_err(|e| PostGenError::SerializationError(e.to_string()))?;

        log::info!("Invoking model: {}", model_id);

        let response = self
            .client
            .invoke_model()
            .model_id(&model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(|e| {
                if let Some(service_error) = e.as_service_error() {
                    log::error!("Service error code: {:?}", service_error.code());
                    PostGenError::AwsServiceError(format!(
                        "{} - {}",
                        service_error.code().unwrap_or("unknown"),
                        service_error.message().unwrap_or("no message")
                    ))
                } else {
                    PostGenError::AwsError(format!("AWS SDK error: {}", e))
                }
            })?;

        let response_bytes = response.body.into_inner();
        Self::parse_response(&response_bytes, &model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_payload_shape() {
        let request = TextGenerationRequest::new("Write a post");
        let payload = TextClient::build_request_payload(
            &request,
            "anthropic.claude-3-haiku-20240307-v1:0",
        )
        .unwrap();
        assert_eq!(payload["messages"][0]["content"], "Write a post");
        assert_eq!(payload["anthropic_version"], "bedrock-2023-05-31");
    }

    #[test]
    fn test_unsupported_model_rejected() {
        let request = TextGenerationRequest::new("x");
        assert!(TextClient::build_request_payload(&request, "openai.gpt-4").is_err());
    }

    #[test]
    fn test_parse_responses_per_family() {
        let titan = br#"{"inputTextTokenCount":3,"results":[{"tokenCount":2,"outputText":"Hi","completionReason":"FINISH"}]}"#;
        assert_eq!(
            TextClient::parse_response(titan, "amazon.titan-text-express-v1").unwrap(),
            "Hi"
        );

        let claude = br#"{"content":[{"type":"text","text":"Hello"}],"stop_reason":"end_turn"}"#;
        assert_eq!(
            TextClient::parse_response(claude, "anthropic.claude-3-haiku-20240307-v1:0").unwrap(),
            "Hello"
        );

        let llama = br#"{"generation":"Yo","stop_reason":"stop"}"#;
        assert_eq!(
            TextClient::parse_response(llama, "meta.llama3-8b-instruct-v1:0").unwrap(),
            "Yo"
        );

        let empty_claude = br#"{"content":[]}"#;
        assert!(
            TextClient::parse_response(empty_claude, "anthropic.claude-3-haiku-20240307-v1:0")
                .is_err()
        );
    }
}
