//! File storage abstraction.
//!
//! Keys are opaque strings of the form `{case_id}/{filename}`. The local
//! backend maps them onto a directory tree; an S3-style backend can slot in
//! behind the same trait. The bank statement parser needs real filesystem
//! paths, hence `local_path`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{ServiceError, ServiceResult};

/// Build the storage key for an upload.
pub fn storage_key(case_id: &str, filename: &str) -> String {
    format!("{}/{}", case_id, filename)
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> ServiceResult<()>;
    async fn get(&self, key: &str) -> ServiceResult<Vec<u8>>;
    async fn delete(&self, key: &str) -> ServiceResult<()>;
    async fn exists(&self, key: &str) -> ServiceResult<bool>;
    /// Filesystem path for backends that have one; `None` for object stores.
    fn local_path(&self, key: &str) -> Option<PathBuf>;
}

/// Local-disk storage backend.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> ServiceResult<PathBuf> {
        // Keys are server-generated, but reject traversal anyway.
        if key.split('/').any(|segment| segment == "..") {
            return Err(ServiceError::Validation(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(Path::new(key)))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn put(&self, key: &str, bytes: &[u8]) -> ServiceResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> ServiceResult<Vec<u8>> {
        let path = self.resolve(key)?;
        fs::read(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ServiceError::NotFound(format!("stored file {} not found", key))
                }
                _ => ServiceError::Internal(e.to_string()),
            })
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Internal(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> ServiceResult<bool> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn local_path(&self, key: &str) -> Option<PathBuf> {
        self.resolve(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_case_slash_filename() {
        assert_eq!(
            storage_key("CASE-20250601-0001", "statement.pdf"),
            "CASE-20250601-0001/statement.pdf"
        );
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let storage = LocalStorage::new("/tmp/case-uploads");
        assert!(storage.resolve("CASE-1/../../etc/passwd").is_err());
        assert!(storage.resolve("CASE-1/doc.pdf").is_ok());
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = std::env::temp_dir().join("caseos-storage-test");
        let storage = LocalStorage::new(&dir);
        let key = "CASE-20250601-0001/test.bin";

        storage.put(key, b"hello").await.unwrap();
        assert!(storage.exists(key).await.unwrap());
        assert_eq!(storage.get(key).await.unwrap(), b"hello");
        assert!(storage.local_path(key).is_some());

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());
        // Deleting a missing key is a no-op.
        storage.delete(key).await.unwrap();

        let _ = fs::remove_dir_all(&dir).await;
    }
}
