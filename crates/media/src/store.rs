use std::{
    future::Future,
    path::{Path, PathBuf},
};

use {
    tokio::io::AsyncWriteExt,
    tracing::{debug, error},
};

use crate::error::{Context, Result};

/// Name of the transient media directory under the system temp dir.
const DEFAULT_DIR_NAME: &str = "wharf_media";

/// Materializes downloaded attachment bytes as uniquely named files.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    dir: PathBuf,
    prefix: String,
}

impl MediaDownloader {
    /// Store files in `dir`, created on first use if absent.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "media_".into(),
        }
    }

    /// File name prefix for created files (e.g. `"wa_"`).
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// `<temp dir>/wharf_media`.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_DIR_NAME)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Await `fetch` and write its bytes to a fresh file with `extension`.
    ///
    /// Fetch, create and write failures are logged and yield `None`; callers
    /// treat that as "no attachment" and keep processing the message.
    pub async fn download<F>(&self, fetch: F, extension: &str) -> Option<PathBuf>
    where
        F: Future<Output = anyhow::Result<Vec<u8>>>,
    {
        let data = match fetch.await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "failed to download media");
                return None;
            },
        };

        match self.save(&data, extension).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, dir = %self.dir.display(), "failed to store media");
                None
            },
        }
    }

    /// Write `data` to a new uniquely named file and return its path.
    pub async fn save(&self, data: &[u8], extension: &str) -> Result<PathBuf> {
        self.ensure_dir().await?;

        let name = format!(
            "{}{}{}",
            self.prefix,
            uuid::Uuid::new_v4().simple(),
            normalize_extension(extension)
        );
        let path = self.dir.join(name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to create {}", path.display()))?;

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e).with_context(|| format!("failed to write {}", path.display()));
        }

        debug!(path = %path.display(), bytes = data.len(), "media file saved");
        Ok(path)
    }

    async fn ensure_dir(&self) -> Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.dir)
            .await
            .with_context(|| format!("failed to create media dir {}", self.dir.display()))
    }
}

impl Default for MediaDownloader {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

/// `"jpg"` and `".jpg"` both become `".jpg"`; characters that could escape
/// the media directory are dropped.
fn normalize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        String::new()
    } else {
        format!(".{cleaned}")
    }
}
