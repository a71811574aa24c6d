/// Instruction sent to the text model for stage one.
pub fn linkedin_post_prompt(topic: &str, tone: &str) -> String {
    format!(
        r#"You are a top 1% LinkedIn content creator.

Write a {tone} LinkedIn post on the topic:
"{topic}"

Rules:
- Strong hook in first 2 lines
- Short paragraphs
- Professional emojis (minimal)
- Clear value
- End with a call-to-action
- 3-5 hashtags at the end
- No markdown
- Sound human

Return ONLY the post text."#
    )
}

/// Instruction sent to the text model for stage two.
pub fn image_prompt_prompt(post: &str) -> String {
    format!(
        r#"You are a creative AI prompt generator.

Based on the following LinkedIn post, generate a visually appealing image prompt that can be used with AI image generation models:

LinkedIn post:
"{post}"

Rules:
- Keep the description clear and concise
- Include key elements and context from the post
- Specify art style, composition, lighting, and color palette
- Clean, modern, corporate look suitable for a professional feed
- Do not include any text, letters, words or logos in the image
- Write a single paragraph
- Output text should be ready for AI image generation models

Return ONLY the image prompt."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_prompt_embeds_topic_and_tone() {
        let prompt = linkedin_post_prompt("Rust in production", "friendly");
        assert!(prompt.contains("Write a friendly LinkedIn post"));
        assert!(prompt.contains("\"Rust in production\""));
        assert!(prompt.contains("3-5 hashtags"));
    }

    #[test]
    fn test_image_prompt_forbids_text() {
        let prompt = image_prompt_prompt("Hello #AI");
        assert!(prompt.contains("\"Hello #AI\""));
        assert!(prompt.contains("Do not include any text"));
        assert!(prompt.contains("single paragraph"));
    }
}
