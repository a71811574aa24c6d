use crate::{
    error::{PostGenError, Result},
    models::{GeneratedImage, ImageFormat, ImageGenerationRequest},
    providers::ImageProvider,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Edge length of the grey square used when rendering fails.
pub const PLACEHOLDER_SIZE: u32 = 512;

const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([229, 231, 235, 255]);

/// Renders `prompt` once and returns it encoded as `format`. Provider output
/// already in `format` is passed through untouched.
pub async fn render_image(
    provider: &dyn ImageProvider,
    prompt: &str,
    format: ImageFormat,
    model: Option<&str>,
) -> Result<GeneratedImage> {
    let mut request = ImageGenerationRequest::new(prompt);
    if let Some(model) = model {
        request = request.with_model(model);
    }

    let raw = provider.generate_image(request).await?;
    let bytes = transcode(raw, format)?;
    Ok(GeneratedImage::new(bytes, format))
}

pub fn placeholder_image(format: ImageFormat) -> Result<GeneratedImage> {
    let canvas = RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_COLOR);
    let bytes = encode(&DynamicImage::ImageRgba8(canvas), format)?;
    Ok(GeneratedImage::new(bytes, format))
}

fn transcode(raw: Vec<u8>, format: ImageFormat) -> Result<Vec<u8>> {
    let source = image::guess_format(&raw)
        .map_err(|e| PostGenError::ImageError(format!("Unrecognised image data: {}", e)))?;
    if source == format.to_image_format() {
        return Ok(raw);
    }

    log::debug!("Converting {:?} image to {}", source, format);
    let decoded = image::load_from_memory_with_format(&raw, source)?;
    encode(&DynamicImage::ImageRgba8(decoded.to_rgba8()), format)
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format.to_image_format())?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let canvas = RgbaImage::from_pixel(width, height, Rgba([10, 102, 194, 255]));
        encode(&DynamicImage::ImageRgba8(canvas), ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_transcode_passes_matching_format_through() {
        let png = png_bytes(4, 4);
        assert_eq!(transcode(png.clone(), ImageFormat::Png).unwrap(), png);
    }

    #[test]
    fn test_transcode_png_to_webp() {
        let webp = transcode(png_bytes(8, 8), ImageFormat::Webp).unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), image::ImageFormat::WebP);
        let decoded = image::load_from_memory(&webp).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn test_transcode_rejects_garbage() {
        assert!(matches!(
            transcode(b"not an image".to_vec(), ImageFormat::Png),
            Err(PostGenError::ImageError(_))
        ));
    }

    #[test]
    fn test_placeholder_is_non_empty() {
        let image = placeholder_image(ImageFormat::Webp).unwrap();
        assert!(!image.is_empty());
        assert_eq!(image.format, ImageFormat::Webp);
    }
}
