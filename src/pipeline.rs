//! Session workflow: generate post, image prompt and image in order, then
//! deliver the result through exactly one publishing strategy.

use crate::{
    config::Config,
    content::{
        generate_image_prompt, generate_linkedin_post, placeholder_image, render_image,
        IMAGE_PROMPT_FALLBACK, POST_FALLBACK,
    },
    error::{PostGenError, Result},
    export,
    linkedin::{share_url, CallbackParams, DemoConnection, LinkedInClient, OAuthSession},
    logger,
    models::{GeneratedImage, ImageFormat, PublishedPost, DEFAULT_TONE},
    providers::ProviderSet,
};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Idle,
    Generating,
    Generated,
    Publishing,
    Exporting,
    Done,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Generating => "generating",
            WorkflowState::Generated => "generated",
            WorkflowState::Publishing => "publishing",
            WorkflowState::Exporting => "exporting",
            WorkflowState::Done => "done",
        }
    }

    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (Idle | Generated | Done, Generating)
                | (Generating, Generated)
                // aborted generation with nothing stored yet
                | (Generating, Idle)
                | (Generated | Done, Publishing | Exporting)
                | (Publishing | Exporting, Done)
                | (Publishing | Exporting, Generated)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Post,
    ImagePrompt,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
}

impl StageFailure {
    fn new(stage: Stage, error: &PostGenError) -> Self {
        Self {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// A stage result: either real output or the placeholder that stood in for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput<T> {
    Generated(T),
    Fallback { placeholder: T, failure: StageFailure },
}

impl<T> StageOutput<T> {
    pub fn value(&self) -> &T {
        match self {
            StageOutput::Generated(value) => value,
            StageOutput::Fallback { placeholder, .. } => placeholder,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            StageOutput::Generated(_) => None,
            StageOutput::Fallback { failure, .. } => Some(failure),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.failure().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub topic: String,
    pub tone: String,
    pub post: StageOutput<String>,
    pub image_prompt: StageOutput<String>,
    pub image: StageOutput<GeneratedImage>,
}

impl GeneratedContent {
    pub fn post_text(&self) -> &str {
        self.post.value()
    }

    pub fn image_prompt_text(&self) -> &str {
        self.image_prompt.value()
    }

    pub fn image(&self) -> &GeneratedImage {
        self.image.value()
    }

    pub fn failures(&self) -> Vec<&StageFailure> {
        [
            self.post.failure(),
            self.image_prompt.failure(),
            self.image.failure(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStrategy {
    /// Post through the LinkedIn API with the session's OAuth token.
    Direct,
    /// Hand text and image back for copy/paste.
    Manual,
    /// Prefilled LinkedIn share URL.
    ShareLink,
    /// Zip archive of post and image.
    Zip,
}

#[derive(Debug, Clone)]
pub enum Delivery {
    Published(PublishedPost),
    Manual {
        post: String,
        image: GeneratedImage,
    },
    ShareLink(String),
    Archive {
        file_name: String,
        bytes: Vec<u8>,
    },
}

/// Everything one user interaction owns. Nothing here is shared between sessions.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: WorkflowState,
    content: Option<GeneratedContent>,
    pub oauth: OAuthSession,
    pub demo: DemoConnection,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: WorkflowState::Idle,
            content: None,
            oauth: OAuthSession::new(),
            demo: DemoConnection::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn content(&self) -> Option<&GeneratedContent> {
        self.content.as_ref()
    }

    fn advance(&mut self, next: WorkflowState, action: &str) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PostGenError::InvalidTransition {
                from: self.state.to_string(),
                action: action.to_string(),
            });
        }
        log::debug!("Session {} {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}

pub struct Pipeline {
    providers: ProviderSet,
    image_format: ImageFormat,
    linkedin: Option<LinkedInClient>,
}

impl Pipeline {
    pub fn new(providers: ProviderSet, image_format: ImageFormat) -> Self {
        Self {
            providers,
            image_format,
            linkedin: None,
        }
    }

    pub fn with_linkedin(mut self, client: LinkedInClient) -> Self {
        self.linkedin = Some(client);
        self
    }

    /// Builds providers and, when its settings are present, the LinkedIn client.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let providers = ProviderSet::from_config(config).await?;
        let mut pipeline = Self::new(providers, config.image_format);
        if config.linkedin.is_complete() {
            pipeline = pipeline.with_linkedin(LinkedInClient::new(&config.linkedin)?);
        }
        Ok(pipeline)
    }

    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    pub fn linkedin(&self) -> Option<&LinkedInClient> {
        self.linkedin.as_ref()
    }

    /// Runs post, image prompt and image in that order. A failing stage is
    /// replaced by its placeholder and recorded; the run itself never aborts.
    pub async fn generate<'s>(
        &self,
        session: &'s mut Session,
        topic: &str,
        tone: Option<&str>,
    ) -> Result<&'s GeneratedContent> {
        if topic.is_empty() {
            return Err(PostGenError::ValidationError("Topic must not be empty".into()));
        }
        let tone = tone
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE);

        session.advance(WorkflowState::Generating, "generate")?;
        log::info!("Generating content for topic: {}", topic);

        match self.run_stages(topic, tone).await {
            Ok(content) => {
                for failure in content.failures() {
                    log::warn!("{:?} stage fell back: {}", failure.stage, failure.message);
                }
                session.content = Some(content);
                session.advance(WorkflowState::Generated, "finish generating")?;
            }
            Err(e) => {
                let rollback = if session.content.is_some() {
                    WorkflowState::Generated
                } else {
                    WorkflowState::Idle
                };
                session.advance(rollback, "abort generating")?;
                return Err(e);
            }
        }

        session
            .content
            .as_ref()
            .ok_or_else(|| PostGenError::ResponseError("Generation produced no content".into()))
    }

    async fn run_stages(&self, topic: &str, tone: &str) -> Result<GeneratedContent> {
        let post = {
            let _timer = logger::timer("LinkedIn post");
            match generate_linkedin_post(
                self.providers.text.as_ref(),
                topic,
                tone,
                self.providers.post_model.as_deref(),
            )
            .await
            {
                Ok(post) => StageOutput::Generated(post),
                Err(e) => StageOutput::Fallback {
                    placeholder: POST_FALLBACK.to_string(),
                    failure: StageFailure::new(Stage::Post, &e),
                },
            }
        };

        let image_prompt = {
            let _timer = logger::timer("image prompt");
            match generate_image_prompt(
                self.providers.text.as_ref(),
                post.value(),
                self.providers.image_prompt_model.as_deref(),
            )
            .await
            {
                Ok(prompt) => StageOutput::Generated(prompt),
                Err(e) => StageOutput::Fallback {
                    placeholder: IMAGE_PROMPT_FALLBACK.to_string(),
                    failure: StageFailure::new(Stage::ImagePrompt, &e),
                },
            }
        };

        let image = {
            let _timer = logger::timer("image");
            match render_image(
                self.providers.image.as_ref(),
                image_prompt.value(),
                self.image_format,
                None,
            )
            .await
            {
                Ok(image) => StageOutput::Generated(image),
                Err(e) => StageOutput::Fallback {
                    placeholder: placeholder_image(self.image_format)?,
                    failure: StageFailure::new(Stage::Image, &e),
                },
            }
        };

        Ok(GeneratedContent {
            topic: topic.to_string(),
            tone: tone.to_string(),
            post,
            image_prompt,
            image,
        })
    }

    fn linkedin_client(&self) -> Result<&LinkedInClient> {
        self.linkedin.as_ref().ok_or_else(|| {
            PostGenError::ConfigError("LinkedIn OAuth settings are not configured".into())
        })
    }

    /// Authorization URL for this session; repeated calls reuse the same state.
    pub fn authorization_url(&self, session: &mut Session) -> Result<String> {
        let client = self.linkedin_client()?;
        session.oauth.authorization_url(client)
    }

    pub async fn complete_authorization(
        &self,
        session: &mut Session,
        callback: &CallbackParams,
    ) -> Result<()> {
        let client = self.linkedin_client()?;
        session.oauth.complete_authorization(client, callback).await
    }

    /// Runs one delivery strategy over the session's content.
    pub async fn deliver(&self, session: &mut Session, strategy: PublishStrategy) -> Result<Delivery> {
        let content = session.content.clone().ok_or_else(|| {
            PostGenError::InvalidTransition {
                from: session.state.to_string(),
                action: "deliver".to_string(),
            }
        })?;

        if matches!(strategy, PublishStrategy::Direct | PublishStrategy::ShareLink)
            && content.post.is_fallback()
        {
            return Err(PostGenError::ValidationError(
                "Post generation failed; regenerate before publishing".into(),
            ));
        }

        let next = match strategy {
            PublishStrategy::Direct => {
                self.linkedin_client()?;
                if !session.oauth.is_connected() {
                    return Err(PostGenError::OAuthError(
                        "Connect to LinkedIn before posting".into(),
                    ));
                }
                WorkflowState::Publishing
            }
            _ => WorkflowState::Exporting,
        };
        session.advance(next, "deliver")?;

        let result = self.run_delivery(session, &content, strategy).await;
        match &result {
            Ok(_) => session.advance(WorkflowState::Done, "finish delivery")?,
            Err(e) => {
                log::error!("Delivery failed: {}", e);
                session.advance(WorkflowState::Generated, "recover")?;
            }
        }
        result
    }

    async fn run_delivery(
        &self,
        session: &Session,
        content: &GeneratedContent,
        strategy: PublishStrategy,
    ) -> Result<Delivery> {
        match strategy {
            PublishStrategy::Direct => {
                let client = self.linkedin_client()?;
                let token = session
                    .oauth
                    .token()
                    .ok_or_else(|| PostGenError::OAuthError("Not connected".into()))?;
                let author = client.member_urn(token).await?;
                let image = (!content.image.is_fallback()).then(|| content.image());
                let post = client
                    .publish(token, &author, content.post_text(), image)
                    .await?;
                Ok(Delivery::Published(post))
            }
            PublishStrategy::Manual => Ok(Delivery::Manual {
                post: content.post_text().to_string(),
                image: content.image().clone(),
            }),
            PublishStrategy::ShareLink => Ok(Delivery::ShareLink(share_url(content.post_text()))),
            PublishStrategy::Zip => Ok(Delivery::Archive {
                file_name: export::DEFAULT_ARCHIVE_NAME.to_string(),
                bytes: export::build_archive(content.post_text(), content.image())?,
            }),
        }
    }
}
