use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// A site photo attached to a quote request.
#[derive(Clone)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PhotoUpload {
    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/gif" => "gif",
            _ => "img",
        }
    }
}

/// Writes quote photos into the upload directory.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { dir: dir.into(), max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns a message for the `photo` field when the upload is unacceptable.
    pub fn check(&self, photo: &PhotoUpload) -> Option<String> {
        if !photo.content_type.starts_with("image/") {
            return Some("Photo must be an image".to_string());
        }
        if photo.bytes.is_empty() {
            return Some("Photo is empty".to_string());
        }
        if photo.bytes.len() > self.max_bytes {
            return Some(format!("Photo must be at most {} bytes", self.max_bytes));
        }
        None
    }

    /// Saves the photo under a fresh name and returns its path.
    pub async fn save(&self, photo: &PhotoUpload) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), photo.extension()));
        tokio::fs::write(&path, &photo.bytes).await?;
        Ok(path)
    }

    pub async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Could not remove orphaned photo");
        }
    }
}
