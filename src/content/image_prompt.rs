use crate::{
    content::prompts,
    error::{PostGenError, Result},
    models::TextGenerationRequest,
    providers::TextProvider,
};

/// Shown in place of the image prompt when the text provider fails.
pub const IMAGE_PROMPT_FALLBACK: &str = "⚠️ Failed to generate image prompt. Please try again.";

pub async fn generate_image_prompt(
    provider: &dyn TextProvider,
    post: &str,
    model: Option<&str>,
) -> Result<String> {
    let mut request = TextGenerationRequest::new(prompts::image_prompt_prompt(post));
    if let Some(model) = model {
        request = request.with_model(model);
    }

    let text = provider.generate_text(request).await?;
    let prompt = single_paragraph(&text);
    if prompt.is_empty() {
        return Err(PostGenError::ResponseError(
            "Text provider returned an empty image prompt".into(),
        ));
    }

    Ok(prompt)
}

/// Collapses all whitespace runs (newlines included) and strips wrapping quotes.
fn single_paragraph(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    joined.trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_paragraph() {
        assert_eq!(
            single_paragraph("  \"A desk,\n\nsoft light.\"\n"),
            "A desk, soft light."
        );
        assert_eq!(single_paragraph("\n \n"), "");
    }
}
