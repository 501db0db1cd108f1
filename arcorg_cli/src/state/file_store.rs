//! JSON file state store

use super::{STATE_VERSION, StateFile, StateStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// State persisted as pretty-printed JSON
///
/// Saves write a sibling temporary file and rename it over the target, so a
/// crash mid-write never leaves a truncated state file behind.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
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
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<StateFile> {
        let exists = fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to inspect state {}", self.path.display()))?;
        if !exists {
            debug!("No state at {}, starting empty", self.path.display());
            return Ok(StateFile::default());
        }

        let data = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read state {}", self.path.display()))?;
        let state: StateFile = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse state {}", self.path.display()))?;

        if state.version != STATE_VERSION {
            anyhow::bail!(
                "Unsupported state version {} in {} (expected {STATE_VERSION})",
                state.version,
                self.path.display()
            );
        }

        debug!(
            "Loaded {} record(s) from {}",
            state.resources.len(),
            self.path.display()
        );
        Ok(state)
    }

    async fn save(&self, state: &StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let data = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path)
            .await
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(data.as_bytes())
            .await
            .context("Failed to write state")?;
        file.sync_all().await.context("Failed to flush state")?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(
            "Saved {} record(s) to {}",
            state.resources.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
