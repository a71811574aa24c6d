use crate::{
    content::prompts,
    error::{PostGenError, Result},
    models::TextGenerationRequest,
    providers::TextProvider,
};

/// Shown in place of the post when the text provider fails.
pub const POST_FALLBACK: &str = "⚠️ Failed to generate post. Please try again.";

/// Generates a LinkedIn post for `topic`. Errors are returned, not swallowed;
/// the pipeline decides whether to substitute [`POST_FALLBACK`].
pub async fn generate_linkedin_post(
    provider: &dyn TextProvider,
    topic: &str,
    tone: &str,
    model: Option<&str>,
) -> Result<String> {
    if topic.is_empty() {
        return Err(PostGenError::ValidationError("Topic must not be empty".into()));
    }

    let mut request = TextGenerationRequest::new(prompts::linkedin_post_prompt(topic, tone));
    if let Some(model) = model {
        request = request.with_model(model);
    }

    let text = provider.generate_text(request).await?;
    let post = text.trim();
    if post.is_empty() {
        return Err(PostGenError::ResponseError(
            "Text provider returned an empty post".into(),
        ));
    }

    Ok(post.to_string())
}
