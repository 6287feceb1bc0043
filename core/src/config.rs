use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Skill-level finalization settings, shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinalizerConfig {
    /// Store partition for session attributes. `None` disables persistence.
    pub attributes_table: Option<String>,
    /// Persist on every turn, not only when the session ends.
    pub save_before_response: bool,
}

impl FinalizerConfig {
    pub fn with_attributes_table<S: Into<String>>(mut self, table: S) -> Self {
        self.attributes_table = Some(table.into());
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).context("failed to parse finalizer config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read finalizer config {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("invalid finalizer config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(table) = &self.attributes_table {
            if table.trim().is_empty() {
                bail!("attributesTable must not be blank");
            }
        }
        Ok(())
    }

    pub fn persistence_enabled(&self) -> bool {
        self.attributes_table.is_some()
    }
}
