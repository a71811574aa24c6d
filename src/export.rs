use crate::{
    error::{PostGenError, Result},
    models::GeneratedImage,
};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

pub const DEFAULT_ARCHIVE_NAME: &str = "linkedin_content.zip";
pub const POST_FILE_NAME: &str = "post.txt";
pub const IMAGE_FILE_STEM: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Zips the post text and image bytes, unmodified, into an in-memory archive.
pub fn build_archive(post: &str, image: &GeneratedImage) -> Result<Vec<u8>> {
    if image.is_empty() {
        return Err(PostGenError::ExportError("Image is empty".into()));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(POST_FILE_NAME, options)?;
    zip.write_all(post.as_bytes())?;

    zip.start_file(image.file_name(IMAGE_FILE_STEM), options)?;
    zip.write_all(&image.bytes)?;

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    log::debug!("Built {} byte archive", bytes.len());
    Ok(bytes)
}

/// Every entry of an archive, in stored order.
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            data,
        });
    }

    Ok(entries)
}

pub fn write_archive(path: &Path, post: &str, image: &GeneratedImage) -> Result<()> {
    let bytes = build_archive(post, image)?;
    fs::write(path, bytes)?;
    log::info!("Archive written to {}", path.display());
    Ok(())
}

/// Writes `post.txt` and the image side by side for manual posting.
pub fn write_files(dir: &Path, post: &str, image: &GeneratedImage) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let post_path = dir.join(POST_FILE_NAME);
    fs::write(&post_path, post)?;

    let image_path = dir.join(image.file_name(IMAGE_FILE_STEM));
    fs::write(&image_path, &image.bytes)?;

    Ok((post_path, image_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageFormat;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn solid_png() -> Vec<u8> {
        let canvas = RgbaImage::from_pixel(10, 10, Rgba([10, 102, 194, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_archive_holds_exactly_post_and_image() {
        let png = solid_png();
        let image = GeneratedImage::new(png.clone(), ImageFormat::Png);

        let archive = build_archive("Hello #AI", &image).unwrap();
        let entries = read_archive(&archive).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "post.txt");
        assert_eq!(entries[0].data, b"Hello #AI");
        assert_eq!(entries[1].name, "image.png");
        assert_eq!(entries[1].data, png);
    }

    #[test]
    fn test_webp_entry_name() {
        let image = GeneratedImage::new(vec![1, 2, 3], ImageFormat::Webp);
        let entries = read_archive(&build_archive("x", &image).unwrap()).unwrap();
        assert_eq!(entries[1].name, "image.webp");
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = GeneratedImage::new(Vec::new(), ImageFormat::Png);
        assert!(matches!(
            build_archive("x", &image),
            Err(PostGenError::ExportError(_))
        ));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage::new(solid_png(), ImageFormat::Png);
        let (post_path, image_path) = write_files(dir.path(), "Hello #AI", &image).unwrap();

        assert_eq!(fs::read_to_string(post_path).unwrap(), "Hello #AI");
        assert_eq!(fs::read(image_path).unwrap(), image.bytes);
    }

    #[test]
    fn test_write_archive_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_ARCHIVE_NAME);
        let image = GeneratedImage::new(solid_png(), ImageFormat::Png);
        write_archive(&path, "Hello #AI", &image).unwrap();

        let entries = read_archive(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
