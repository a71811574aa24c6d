use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostGenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    ValidationError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("{context} failed with HTTP {status}: {body}")]
    HttpStatus {
        context: String,
        status: u16,
        body: String,
    },
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("OAuth state mismatch, please reconnect")]
    StateMismatch,
    #[error("OAuth error: {0}")]
    OAuthError(String),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("Export error: {0}")]
    ExportError(String),
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },
    #[error("AWS error: {0}")]
    AwsError(String),
    #[error("AWS service error: {0}")]
    AwsServiceError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PostGenError {
    /// Short machine-readable name, used when a stage failure is recorded.
    pub fn kind(&self) -> &'static str {
        match self {
            PostGenError::ConfigError(_) => "config",
            PostGenError::ValidationError(_) => "validation",
            PostGenError::RequestError(_) => "request",
            PostGenError::HttpStatus { .. } => "http_status",
            PostGenError::ResponseError(_) => "response",
            PostGenError::SerializationError(_) => "serialization",
            PostGenError::StateMismatch => "state_mismatch",
            PostGenError::OAuthError(_) => "oauth",
            PostGenError::ImageError(_) => "image",
            PostGenError::ExportError(_) => "export",
            PostGenError::InvalidTransition { .. } => "invalid_transition",
            PostGenError::AwsError(_) | PostGenError::AwsServiceError(_) => "aws",
            PostGenError::Io(_) => "io",
        }
    }

    /// Builds an `HttpStatus` error from a non-success response, consuming its body.
    pub async fn from_response(context: &str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        PostGenError::HttpStatus {
            context: context.to_string(),
            status,
            body,
        }
    }
}

impl From<reqwest::Error> for PostGenError {
    fn from(e: reqwest::Error) -> Self {
        PostGenError::RequestError(e.to_string())
    }
}

impl From<serde_json::Error> for PostGenError {
    fn from(e: serde_json::Error) -> Self {
        PostGenError::SerializationError(e.to_string())
    }
}

impl From<image::ImageError> for PostGenError {
    fn from(e: image::ImageError) -> Self {
        PostGenError::ImageError(e.to_string())
    }
}

impl From<zip::result::ZipError> for PostGenError {
    fn from(e: zip::result::ZipError) -> Self {
        PostGenError::ExportError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PostGenError>;
