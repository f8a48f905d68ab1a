use std::path::{Path, PathBuf};

use bytes::Bytes;
use file_format::FileFormat;
use image::ImageFormat;
use uuid::Uuid;

use crate::errors::AppError;

pub const MEDIA_URL: &str = "/media";
const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    /// Detects the image format from the content itself, ignoring whatever
    /// name or content type the client claimed.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match FileFormat::from_bytes(data) {
            FileFormat::GraphicsInterchangeFormat => Some(Self::Gif),
            FileFormat::PortableNetworkGraphics
            | FileFormat::AnimatedPortableNetworkGraphics => Some(Self::Png),
            FileFormat::JointPhotographicExpertsGroup => Some(Self::Jpeg),
            FileFormat::Webp => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            Self::Gif => ImageFormat::Gif,
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Webp => ImageFormat::WebP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRejection {
    NotAnImage,
    Corrupted,
}

/// An uploaded image whose format is known and whose content decodes.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub kind: ImageKind,
    pub data: Bytes,
}

impl ImageUpload {
    /// Decodes the whole file, so only call it off the async workers.
    pub fn verify(data: Bytes) -> Result<Self, ImageRejection> {
        let kind = ImageKind::detect(&data).ok_or(ImageRejection::NotAnImage)?;
        if let Err(e) = image::load_from_memory_with_format(&data, kind.image_format()) {
            tracing::debug!(error = %e, ?kind, "upload does not decode");
            return Err(ImageRejection::Corrupted);
        }
        Ok(Self { kind, data })
    }
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image under `posts/` and returns the path stored on the post.
    pub async fn save_post_image(&self, image: &ImageUpload) -> Result<String, AppError> {
        let directory = self.root.join(POSTS_DIR);
        tokio::fs::create_dir_all(&directory).await?;

        let file_name = format!("{}.{}", Uuid::now_v7(), image.kind.extension());
        tokio::fs::write(directory.join(&file_name), &image.data).await?;
        tracing::info!(file = %file_name, size = image.data.len(), "stored post image");

        Ok(format!("{POSTS_DIR}/{file_name}"))
    }
}

pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let mut data = Vec::new();
        image::DynamicImage::new_rgb8(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut data), format)
            .unwrap();
        data
    }

    #[test]
    fn test_detect_known_formats() {
        assert_eq!(ImageKind::detect(SMALL_GIF), Some(ImageKind::Gif));
        assert_eq!(ImageKind::detect(&encoded(ImageFormat::Png)), Some(ImageKind::Png));
        assert_eq!(ImageKind::detect(&encoded(ImageFormat::Jpeg)), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(b"not an image"), None);
        assert_eq!(ImageKind::detect(b""), None);
    }

    #[test]
    fn test_verify_accepts_decodable_images() {
        let gif = ImageUpload::verify(Bytes::from_static(SMALL_GIF)).unwrap();
        assert_eq!(gif.kind, ImageKind::Gif);
        let png = ImageUpload::verify(encoded(ImageFormat::Png).into()).unwrap();
        assert_eq!(png.kind, ImageKind::Png);
    }

    #[test]
    fn test_verify_rejects_corrupted_images() {
        assert_eq!(
            ImageUpload::verify(Bytes::from_static(b"GIF89a this is not image data at all"))
                .unwrap_err(),
            ImageRejection::Corrupted
        );
        let mut png = encoded(ImageFormat::Png);
        png.truncate(20);
        assert_eq!(
            ImageUpload::verify(png.into()).unwrap_err(),
            ImageRejection::Corrupted
        );
        assert_eq!(
            ImageUpload::verify(Bytes::from_static(b"plain text")).unwrap_err(),
            ImageRejection::NotAnImage
        );
    }

    #[tokio::test]
    async fn test_save_post_image_writes_under_posts() {
        let root = std::env::temp_dir().join(format!("quill-media-test-{}", Uuid::now_v7()));
        let storage = MediaStorage::new(&root);
        let image = ImageUpload {
            kind: ImageKind::Gif,
            data: Bytes::from_static(SMALL_GIF),
        };

        let path = storage.save_post_image(&image).await.unwrap();

        assert!(path.starts_with("posts/") && path.ends_with(".gif"));
        let written = tokio::fs::read(root.join(&path)).await.unwrap();
        assert_eq!(written, SMALL_GIF);
        assert_eq!(media_url(&path), format!("/media/{path}"));
        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
