//! Named, reusable `TaskConfig` snapshots independent of any run.
//!
//! Supplements the in-scope C10 operation set with the original's `config_presets`
//! surface: configs a user wants to reuse across registrations without re-typing
//! them, stored as one JSON file per preset.

use std::path::PathBuf;

use crate::config::TaskConfig;
use crate::config_version;
use crate::error::Result;

pub struct ConfigPresetStore {
    root: PathBuf,
}

impl ConfigPresetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    pub async fn save_preset(&self, name: &str, config: &TaskConfig) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let raw = serde_json::to_string_pretty(config)?;
        tokio::fs::write(self.path_for(name), raw).await?;
        Ok(())
    }

    pub async fn load_preset(&self, name: &str) -> Result<Option<TaskConfig>> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw)?;
                Ok(Some(config_version::upgrade(value)?))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
