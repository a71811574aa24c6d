use crate::error::{PostGenError, Result};
use crate::models::ImageFormat;
use std::env;
use std::str::FromStr;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co/hf-inference";
pub const DEFAULT_HF_IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";
pub const DEFAULT_LINKEDIN_SCOPE: &str = "openid profile email w_member_social";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBackend {
    Gemini,
    Bedrock,
}

impl FromStr for TextBackend {
    type Err = PostGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(TextBackend::Gemini),
            "bedrock" | "aws" => Ok(TextBackend::Bedrock),
            other => Err(PostGenError::ConfigError(format!(
                "Unknown TEXT_PROVIDER '{}', expected gemini or bedrock",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackend {
    HuggingFace,
    Bedrock,
}

impl FromStr for ImageBackend {
    type Err = PostGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(ImageBackend::HuggingFace),
            "bedrock" | "aws" => Ok(ImageBackend::Bedrock),
            other => Err(PostGenError::ConfigError(format!(
                "Unknown IMAGE_PROVIDER '{}', expected huggingface or bedrock",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub post_model: String,
    pub image_prompt_model: String,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct LinkedInConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub text_backend: TextBackend,
    pub image_backend: ImageBackend,
    pub image_format: ImageFormat,
    pub gemini: GeminiConfig,
    pub huggingface: HuggingFaceConfig,
    pub bedrock: BedrockConfig,
    pub linkedin: LinkedInConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            post_model: DEFAULT_GEMINI_MODEL.to_string(),
            image_prompt_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models(
        mut self,
        post_model: impl Into<String>,
        image_prompt_model: impl Into<String>,
    ) -> Self {
        self.post_model = post_model.into();
        self.image_prompt_model = image_prompt_model.into();
        self
    }
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        HuggingFaceConfig {
            api_key: None,
            base_url: DEFAULT_HF_BASE_URL.to_string(),
            model: DEFAULT_HF_IMAGE_MODEL.to_string(),
        }
    }
}

impl HuggingFaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        LinkedInConfig {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scope: DEFAULT_LINKEDIN_SCOPE.to_string(),
        }
    }
}

impl LinkedInConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.redirect_uri.is_some()
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            text_model: None,
            image_model: None,
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            text_backend: TextBackend::Gemini,
            image_backend: ImageBackend::HuggingFace,
            image_format: ImageFormat::Webp,
            gemini: GeminiConfig::default(),
            huggingface: HuggingFaceConfig::default(),
            bedrock: BedrockConfig::default(),
            linkedin: LinkedInConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads configuration from the process environment. Call `dotenv::dotenv()`
    /// first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => Some(raw.parse().map_err(|_| {
                PostGenError::ConfigError(format!("PORT must be a port number, got '{}'", raw))
            })?),
            None => None,
        };
        let text_backend = get("TEXT_PROVIDER")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(TextBackend::Gemini);
        let image_backend = get("IMAGE_PROVIDER")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(ImageBackend::HuggingFace);
        let image_format = get("IMAGE_FORMAT")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(ImageFormat::Webp);

        let mut gemini = GeminiConfig::default();
        gemini.api_key = get("GOOGLE_API_KEY");
        if let Some(url) = get("GEMINI_BASE_URL") {
            gemini.base_url = url;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            gemini.post_model = model.clone();
            gemini.image_prompt_model = model;
        }
        if let Some(model) = get("GEMINI_IMAGE_PROMPT_MODEL") {
            gemini.image_prompt_model = model;
        }

        let mut huggingface = HuggingFaceConfig::default();
        huggingface.api_key = get("HUGGINGFACE_API_KEY");
        if let Some(url) = get("HF_BASE_URL") {
            huggingface.base_url = url;
        }
        if let Some(model) = get("HF_IMAGE_MODEL") {
            huggingface.model = model;
        }

        let bedrock = BedrockConfig {
            region: get("AWS_REGION").or_else(|| get("AWS_DEFAULT_REGION")),
            access_key: get("AWS_ACCESS_KEY_ID"),
            secret_key: get("AWS_SECRET_ACCESS_KEY"),
            text_model: get("BEDROCK_TEXT_MODEL"),
            image_model: get("BEDROCK_IMAGE_MODEL"),
        };

        let mut linkedin = LinkedInConfig::default();
        linkedin.client_id = get("LINKEDIN_CLIENT_ID");
        linkedin.client_secret = get("LINKEDIN_CLIENT_SECRET");
        linkedin.redirect_uri = get("LINKEDIN_REDIRECT_URI");
        if let Some(scope) = get("LINKEDIN_SCOPE") {
            linkedin.scope = scope;
        }

        Ok(Config {
            port,
            text_backend,
            image_backend,
            image_format,
            gemini,
            huggingface,
            bedrock,
            linkedin,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self.text_backend = TextBackend::Gemini;
        self
    }

    pub fn with_huggingface(mut self, config: HuggingFaceConfig) -> Self {
        self.huggingface = config;
        self.image_backend = ImageBackend::HuggingFace;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self
    }

    pub fn with_linkedin(mut self, config: LinkedInConfig) -> Self {
        self.linkedin = config;
        self
    }

    /// Checks that every secret the selected providers need is present.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.text_backend == TextBackend::Gemini && self.gemini.api_key.is_none() {
            missing.push("GOOGLE_API_KEY");
        }
        if self.image_backend == ImageBackend::HuggingFace && self.huggingface.api_key.is_none()
        {
            missing.push("HUGGINGFACE_API_KEY");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PostGenError::ConfigError(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }

    /// LinkedIn settings, required for OAuth publishing and server mode.
    pub fn linkedin(&self) -> Result<&LinkedInConfig> {
        let mut missing = Vec::new();
        if self.linkedin.client_id.is_none() {
            missing.push("LINKEDIN_CLIENT_ID");
        }
        if self.linkedin.client_secret.is_none() {
            missing.push("LINKEDIN_CLIENT_SECRET");
        }
        if self.linkedin.redirect_uri.is_none() {
            missing.push("LINKEDIN_REDIRECT_URI");
        }

        if missing.is_empty() {
            Ok(&self.linkedin)
        } else {
            Err(PostGenError::ConfigError(format!(
                "Missing required LinkedIn configuration: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.text_backend, TextBackend::Gemini);
        assert_eq!(config.image_backend, ImageBackend::HuggingFace);
        assert_eq!(config.image_format, ImageFormat::Webp);
        assert_eq!(config.huggingface.model, DEFAULT_HF_IMAGE_MODEL);
        assert_eq!(config.linkedin.scope, DEFAULT_LINKEDIN_SCOPE);
    }

    #[test]
    fn test_missing_keys_abort_validation() {
        let config = Config::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required configuration: GOOGLE_API_KEY, HUGGINGFACE_API_KEY"
        );
    }

    #[test]
    fn test_complete_configuration() {
        let config = Config::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("HUGGINGFACE_API_KEY", "hf-key"),
            ("IMAGE_FORMAT", "png"),
            ("GEMINI_IMAGE_PROMPT_MODEL", "gemini-2.0-flash"),
            ("LINKEDIN_CLIENT_ID", "id"),
            ("LINKEDIN_CLIENT_SECRET", "secret"),
            ("LINKEDIN_REDIRECT_URI", "http://localhost:8080/auth/linkedin/callback"),
            ("PORT", "9000"),
        ]))
        .unwrap();

        assert!(config.validate().is_ok());
        assert!(config.linkedin().is_ok());
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.gemini.post_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.image_prompt_model, "gemini-2.0-flash");
    }

    #[test]
    fn test_bedrock_backends_skip_provider_keys() {
        let config = Config::from_lookup(lookup(&[
            ("TEXT_PROVIDER", "bedrock"),
            ("IMAGE_PROVIDER", "bedrock"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.linkedin(),
            Err(PostGenError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(Config::from_lookup(lookup(&[("TEXT_PROVIDER", "cohere")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("IMAGE_FORMAT", "gif")])).is_err());
    }
}
