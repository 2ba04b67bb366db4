//! Project configuration loaded from `formbuilder.toml`.
//!
//! A missing file is not an error: every key has a default.

use crate::core::error::FormsError;
use crate::core::schemas;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "formbuilder.toml";
pub const DATA_DIR_ENV: &str = "FORMBUILDER_DATA_DIR";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormsConfig {
    /// Store directory, relative to the project root unless absolute.
    pub data_dir: PathBuf,
    /// Name recorded on audit events.
    pub actor: String,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub log_file: String,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".formbuilder"),
            actor: "formbuilder".to_string(),
            audit: AuditConfig::default(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: schemas::AUDIT_EVENTS_NAME.to_string(),
        }
    }
}

/// Load `formbuilder.toml` from the project root, or the explicit path if given.
pub fn load_config(project_root: &Path, explicit: Option<&Path>) -> Result<FormsConfig, FormsError> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => project_root.join(CONFIG_FILE_NAME),
    };

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(FormsError::IoError)?;
        toml::from_str::<FormsConfig>(&content)?
    } else if explicit.is_some() {
        return Err(FormsError::NotFound(format!(
            "config file {}",
            config_path.display()
        )));
    } else {
        FormsConfig::default()
    };

    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => Ok(config.with_data_dir(PathBuf::from(dir))),
        _ => Ok(config),
    }
}
