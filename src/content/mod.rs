//! The three generation stages: topic to post, post to image prompt, and
//! image prompt to rendered image.

pub mod image;
pub mod image_prompt;
pub mod post;
pub mod prompts;

pub use self::image::{placeholder_image, render_image, PLACEHOLDER_SIZE};
pub use image_prompt::{generate_image_prompt, IMAGE_PROMPT_FALLBACK};
pub use post::{generate_linkedin_post, POST_FALLBACK};
