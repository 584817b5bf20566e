use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Where exported files end up.
#[async_trait]
pub trait Downloads: Send + Sync {
    async fn save(&self, file_name: &str, contents: &str) -> Result<PathBuf>;
}

/// Writes downloads into a directory, replacing files of the same name.
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl Downloads for DirectoryDownloads {
    async fn save(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved {}", path.display());
        Ok(path)
    }
}
