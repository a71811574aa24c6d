pub mod image_client;
pub mod text_client;

use crate::{config::BedrockConfig, error::Result};
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::Client;
use serde::{Deserialize, Serialize};

pub use image_client::ImageClient;
pub use text_client::TextClient;

/// Model family behind a Bedrock model id; decides request and response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelProvider {
    Amazon,
    Anthropic,
    Cohere,
    AI21,
    Meta,
    Mistral,
}

impl ModelProvider {
    pub fn from_model_id(model_id: &str) -> Option<Self> {
        match model_id {
            id if id.starts_with("amazon.titan") => Some(ModelProvider::Amazon),
            // inference profiles are only provisioned for Claude here
            id if id.starts_with("anthropic.claude") || id.starts_with("arn:aws:bedrock") => {
                Some(ModelProvider::Anthropic)
            }
            id if id.starts_with("cohere.command") => Some(ModelProvider::Cohere),
            id if id.starts_with("ai21.") => Some(ModelProvider::AI21),
            id if id.starts_with("meta.llama") => Some(ModelProvider::Meta),
            id if id.starts_with("mistral.mistral") => Some(ModelProvider::Mistral),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct BedrockClient {
    text_client: TextClient,
    image_client: ImageClient,
}

impl BedrockClient {
    pub async fn new(bedrock_config: BedrockConfig) -> Result<Self> {
        let region = bedrock_config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            aws_config::defaults(BehaviorVersion::latest())
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "postgen",
                ))
                .region(aws_sdk_bedrockruntime::config::Region::new(region))
                .load()
                .await
        } else {
            aws_config::defaults(BehaviorVersion::latest())
                .region(aws_sdk_bedrockruntime::config::Region::new(region))
                .load()
                .await
        };

        let client = Client::new(&aws_config);

        let mut text_client = TextClient::new(client.clone());
        if let Some(model) = bedrock_config.text_model {
            text_client = text_client.with_default_model(model);
        }
        let mut image_client = ImageClient::new(client);
        if let Some(model) = bedrock_config.image_model {
            image_client = image_client.with_default_model(model);
        }

        Ok(Self {
            text_client,
            image_client,
        })
    }

    pub fn text(&self) -> &TextClient {
        &self.text_client
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}
