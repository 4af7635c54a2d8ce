use crate::traits::PostedStore;
use crate::types::{BotError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Posted identifiers kept as one line each, oldest first.
///
/// Saves go to a sibling temp file which is fsynced and renamed over the
/// target, so a crash mid-save leaves the previous file intact.
pub struct FilePostedStore {
    path: PathBuf,
}

impl FilePostedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "posted".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PostedStore for FilePostedStore {
    async fn load(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No posted log at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(BotError::Storage(format!(
                    "reading {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let entries: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        debug!("Loaded {} posted identifiers from {}", entries.len(), self.path.display());
        Ok(entries)
    }

    async fn save(&self, identifiers: &[String]) -> Result<()> {
        let storage_err =
            |what: &str, e: std::io::Error| BotError::Storage(format!("{} {}: {}", what, self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("creating directory for", e))?;
        }

        let mut body = identifiers.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| storage_err("creating temp file for", e))?;
        file.write_all(body.as_bytes())
            .await
            .map_err(|e| storage_err("writing", e))?;
        file.sync_all()
            .await
            .map_err(|e| storage_err("syncing", e))?;
        drop(file);

        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| storage_err("replacing", e))?;

        debug!("Saved {} posted identifiers to {}", identifiers.len(), self.path.display());
        Ok(())
    }
}
