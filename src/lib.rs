pub mod bedrock;
pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod linkedin;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;

pub use bedrock::{BedrockClient, ImageClient, ModelProvider, TextClient};
pub use config::{
    BedrockConfig, Config, GeminiConfig, HuggingFaceConfig, ImageBackend, LinkedInConfig,
    TextBackend,
};
pub use error::{PostGenError, Result};
pub use linkedin::{AccessToken, CallbackParams, LinkedInClient, OAuthSession};
pub use models::{GeneratedImage, ImageFormat, PublishedPost, Visibility};
pub use pipeline::{
    Delivery, GeneratedContent, Pipeline, PublishStrategy, Session, Stage, StageFailure,
    StageOutput, WorkflowState,
};
pub use providers::{
    GeminiProvider, HuggingFaceProvider, ImageProvider, ProviderSet, TextProvider,
};
