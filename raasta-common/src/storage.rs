//! Photo storage capability
//!
//! The report core only needs to hand bytes to a store and keep the returned handle.
//! [`LocalPhotoStore`] keeps files under the service root folder; other backends
//! implement [`PhotoStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::report::Photo;
use crate::{time, Result};

/// Metadata about an uploaded photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMeta {
    pub content_type: String,
    pub file_name: Option<String>,
    pub size: usize,
}

/// Handle returned by a photo store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPhoto {
    pub url: String,
    pub storage_id: String,
}

impl StoredPhoto {
    /// Convert into the record embedded in a report
    pub fn into_photo(self) -> Photo {
        Photo {
            url: self.url,
            public_id: self.storage_id,
            uploaded_at: time::now(),
        }
    }
}

/// Storage backend for report photos
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Persist the bytes and return a handle to them
    async fn store(&self, bytes: Vec<u8>, meta: PhotoMeta) -> Result<StoredPhoto>;

    /// Delete a stored photo that no report references. Removing a missing photo is not an error.
    async fn remove(&self, photo: &StoredPhoto) -> Result<()>;
}

/// Filesystem-backed photo store
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalPhotoStore {
    /// Store files in `dir`, served under `/photos`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: "/photos".to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn extension_for(content_type: &str) -> &'static str {
        match content_type {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/heic" => "heic",
            _ => "img",
        }
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn store(&self, bytes: Vec<u8>, meta: PhotoMeta) -> Result<StoredPhoto> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let storage_id = Uuid::new_v4().to_string();
        let file_name = format!(
            "{}.{}",
            storage_id,
            Self::extension_for(&meta.content_type)
        );
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await?;

        debug!(
            path = %path.display(),
            size = bytes.len(),
            content_type = %meta.content_type,
            "Stored report photo"
        );

        Ok(StoredPhoto {
            url: format!("{}/{}", self.url_prefix, file_name),
            storage_id,
        })
    }

    async fn remove(&self, photo: &StoredPhoto) -> Result<()> {
        let Some(file_name) = photo.url.rsplit('/').next().filter(|name| !name.is_empty()) else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => {
                debug!(storage_id = %photo.storage_id, "Removed report photo");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path().join("photos"));

        let stored = store
            .store(
                vec![0xFF, 0xD8, 0xFF],
                PhotoMeta {
                    content_type: "image/jpeg".into(),
                    file_name: Some("junction.jpg".into()),
                    size: 3,
                },
            )
            .await
            .unwrap();

        assert!(stored.url.starts_with("/photos/"));
        assert!(stored.url.ends_with(".jpg"));
        let path = store.dir().join(format!("{}.jpg", stored.storage_id));
        assert_eq!(std::fs::read(path).unwrap(), vec![0xFF, 0xD8, 0xFF]);

        let photo = stored.clone().into_photo();
        assert_eq!(photo.public_id, stored.storage_id);
    }

    #[tokio::test]
    async fn test_local_store_remove_deletes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPhotoStore::new(dir.path().join("photos"));
        let meta = PhotoMeta {
            content_type: "image/png".into(),
            file_name: None,
            size: 2,
        };

        let stored = store.store(vec![1, 2], meta).await.unwrap();
        let path = store.dir().join(format!("{}.png", stored.storage_id));
        assert!(path.exists());

        store.remove(&stored).await.unwrap();
        assert!(!path.exists());
        // Already gone
        store.remove(&stored).await.unwrap();
    }
}
