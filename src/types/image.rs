//! Image inputs for recognition

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::{FleamarkError, Result};

/// Where an image's bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Bytes already in memory (e.g. an upload buffer).
    Bytes(Bytes),
    /// A file on local disk, read lazily.
    Path(PathBuf),
}

/// An image selected by the user for recognition.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// File name as presented by the user agent.
    pub name: String,
    /// Declared MIME type, e.g. `image/png`.
    pub mime_type: String,
    pub source: ImageSource,
}

impl ImageInput {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: ImageSource::Bytes(bytes.into()),
        }
    }

    /// Reference an image on disk. The MIME type is guessed from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            mime_type: mime_from_extension(&path).to_string(),
            source: ImageSource::Path(path),
        }
    }

    /// Whether the declared MIME type is an `image/*` type.
    pub fn is_image(&self) -> bool {
        self.mime_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }

    /// Size in bytes, when it can be known without reading the content.
    pub async fn size_hint(&self) -> Option<u64> {
        match &self.source {
            ImageSource::Bytes(bytes) => Some(bytes.len() as u64),
            ImageSource::Path(path) => tokio::fs::metadata(path).await.ok().map(|m| m.len()),
        }
    }

    /// Load the image content.
    ///
    /// Returns [`FleamarkError::Hashing`] when the bytes cannot be read.
    pub async fn read(&self) -> Result<LoadedImage> {
        let bytes = match &self.source {
            ImageSource::Bytes(bytes) => bytes.clone(),
            ImageSource::Path(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| FleamarkError::Hashing(format!("{}: {e}", path.display())))?,
        };
        Ok(LoadedImage {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            bytes,
        })
    }
}

/// An image whose bytes are in memory, ready for hashing and recognition.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl LoadedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_guess_is_case_insensitive() {
        assert_eq!(mime_from_extension(Path::new("shot.PNG")), "image/png");
        assert_eq!(mime_from_extension(Path::new("a/b.jpeg")), "image/jpeg");
        assert_eq!(
            mime_from_extension(Path::new("notes.txt")),
            "application/octet-stream"
        );
    }

    #[test]
    fn is_image_checks_prefix() {
        assert!(ImageInput::from_bytes("a.png", "image/png", vec![1]).is_image());
        assert!(ImageInput::from_bytes("a.png", " IMAGE/WEBP", vec![1]).is_image());
        assert!(!ImageInput::from_bytes("a.pdf", "application/pdf", vec![1]).is_image());
    }

    #[tokio::test]
    async fn missing_file_is_a_hashing_error() {
        let input = ImageInput::from_path("/definitely/not/here.png");
        assert_eq!(input.name, "here.png");
        assert!(input.size_hint().await.is_none());
        let err = input.read().await.unwrap_err();
        assert!(matches!(err, FleamarkError::Hashing(_)));
    }
}
