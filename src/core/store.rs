//! Store abstraction for form state.
//!
//! A Store is the directory holding `forms.db` and the audit log, plus the
//! identity stamped on audit events.

use crate::core::config::FormsConfig;
use crate::core::schemas;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
    /// Actor recorded on audit events
    pub actor: String,
    pub audit_enabled: bool,
    pub audit_log_file: String,
}

impl Store {
    /// Store at `root` with default actor and audit settings.
    pub fn at(root: PathBuf) -> Self {
        let defaults = FormsConfig::default();
        Self {
            root,
            actor: defaults.actor,
            audit_enabled: defaults.audit.enabled,
            audit_log_file: defaults.audit.log_file,
        }
    }

    pub fn from_config(project_root: &Path, config: &FormsConfig) -> Self {
        let root = if config.data_dir.is_absolute() {
            config.data_dir.clone()
        } else {
            project_root.join(&config.data_dir)
        };
        Self {
            root,
            actor: config.actor.clone(),
            audit_enabled: config.audit.enabled,
            audit_log_file: config.audit.log_file.clone(),
        }
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join(&self.audit_log_file)
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(schemas::FORMS_DB_NAME)
    }
}

impl FormsConfig {
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = dir;
        self
    }
}
