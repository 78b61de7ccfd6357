use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackendError;

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    pub upsert: bool,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the file at `path` and returns its public url.
    async fn upload(
        &self,
        file: &UploadFile,
        path: &str,
        options: UploadOptions,
    ) -> Result<String, BackendError>;
}

/// Object storage on the local filesystem, for offline use.
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(BackendError::Rejected(format!("invalid storage path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        file: &UploadFile,
        path: &str,
        options: UploadOptions,
    ) -> Result<String, BackendError> {
        let target = self.resolve(path)?;
        if !options.upsert && tokio::fs::try_exists(&target).await? {
            return Err(BackendError::Rejected(format!("{path} already exists")));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.bytes).await?;
        tracing::debug!(path = %target.display(), size = file.size(), "Stored upload locally");
        Ok(format!("file://{}", target.display()))
    }
}
