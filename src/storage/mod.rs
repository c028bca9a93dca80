// Local photo store for contribution uploads.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_FILES_PER_UPLOAD: usize = 5;

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredPhoto {
    pub filename: String,
    pub original: String,
    pub size: usize,
}

/// Stored filenames are random hex, so concurrent uploads never contend on
/// names; the original name survives only in metadata.
#[derive(Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("cannot create upload dir: {}", e)))
    }

    /// Lowercased extension when the name carries an allowed one.
    pub fn allowed_extension(name: &str) -> Option<String> {
        let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    /// Strip any path components a client smuggled into the filename.
    pub fn sanitize_name(name: &str) -> String {
        name.rsplit(['/', '\\']).next().unwrap_or(name).to_string()
    }

    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<StoredPhoto> {
        let ext = Self::allowed_extension(original_name).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Extension non permise: {}. Permises: {}",
                Self::sanitize_name(original_name),
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        if bytes.len() > MAX_FILE_SIZE {
            return Err(AppError::InvalidInput(
                "Fichier trop volumineux (max 5 Mo).".to_string(),
            ));
        }

        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("write failed: {}", e)))?;

        tracing::info!("Photo stored: {} ({} bytes)", filename, bytes.len());

        Ok(StoredPhoto {
            filename,
            original: Self::sanitize_name(original_name),
            size: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extension() {
        assert_eq!(PhotoStore::allowed_extension("a.jpg").as_deref(), Some("jpg"));
        assert_eq!(PhotoStore::allowed_extension("a.JPEG").as_deref(), Some("jpeg"));
        assert_eq!(PhotoStore::allowed_extension("a.webp").as_deref(), Some("webp"));
        assert_eq!(PhotoStore::allowed_extension("a.gif"), None);
        assert_eq!(PhotoStore::allowed_extension("a.pdf"), None);
        assert_eq!(PhotoStore::allowed_extension("noext"), None);
    }

    #[test]
    fn test_sanitize_name_strips_paths() {
        assert_eq!(PhotoStore::sanitize_name("../../etc/passwd.png"), "passwd.png");
        assert_eq!(PhotoStore::sanitize_name("c:\\temp\\x.jpg"), "x.jpg");
        assert_eq!(PhotoStore::sanitize_name("photo.jpg"), "photo.jpg");
    }

    #[tokio::test]
    async fn test_save_uses_random_name_and_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let stored = store.save("démo photo.jpg", b"fake-jpeg-bytes").await.unwrap();
        assert!(stored.filename.ends_with(".jpg"));
        assert_ne!(stored.filename, "démo photo.jpg");
        assert_eq!(stored.original, "démo photo.jpg");
        assert_eq!(stored.size, 15);
        assert!(dir.path().join(&stored.filename).exists());
    }

    #[tokio::test]
    async fn test_save_rejects_bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let err = store.save("malware.exe", b"x").await.unwrap_err();
        assert!(err.to_string().contains("Extension non permise"));
    }

    #[tokio::test]
    async fn test_save_rejects_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let big = vec![0u8; MAX_FILE_SIZE + 1];
        let err = store.save("big.png", &big).await.unwrap_err();
        assert!(err.to_string().contains("trop volumineux"));
    }
}
