use std::path::PathBuf;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

use crate::config::UploadConfig;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists `body` under `filename` and returns the public URL path the
    /// stored file is served from.
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<String>;
}

/// Stores uploads on the local filesystem under the configured directory.
pub struct LocalFiles {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFiles {
    pub fn new(cfg: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&cfg.dir),
            public_prefix: cfg.public_prefix.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStore for LocalFiles {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("create uploads dir")?;
        let path = self.root.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(format!("{}/{}", self.public_prefix, filename))
    }
}

/// Keeps uploads in memory. Used by `AppState::fake()`.
#[derive(Default)]
pub struct MemoryFiles {
    pub saved: std::sync::Mutex<Vec<(String, Bytes)>>,
}

#[async_trait]
impl FileStore for MemoryFiles {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<String> {
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), body));
        Ok(format!("/uploads/profile-pictures/{}", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_files_writes_and_returns_public_path() {
        let dir = std::env::temp_dir().join(format!("stockroom-test-{}", uuid::Uuid::new_v4()));
        let store = LocalFiles::new(&UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            public_prefix: "/uploads/profile-pictures/".into(),
        });

        let url = store
            .save("pic.png", Bytes::from_static(b"png-bytes"))
            .await
            .expect("save should succeed");
        assert_eq!(url, "/uploads/profile-pictures/pic.png");

        let on_disk = tokio::fs::read(dir.join("pic.png")).await.expect("file exists");
        assert_eq!(on_disk, b"png-bytes");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn memory_files_records_uploads() {
        let store = MemoryFiles::default();
        let url = store
            .save("x.jpg", Bytes::from_static(b"jpg"))
            .await
            .unwrap();
        assert_eq!(url, "/uploads/profile-pictures/x.jpg");
        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }
}
