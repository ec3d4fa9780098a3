//! Hot-reloadable configuration.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{load_config, AppConfig, ConfigError};

/// Holds the last valid configuration and the file it came from.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: AppConfig,
}

impl ConfigStore {
    /// Load the initial configuration; fails when it is invalid.
    pub fn open(path: Option<&Path>) -> Result<Self, ConfigError> {
        let current = load_config(path)?;
        Ok(Self {
            path: path.map(Path::to_path_buf),
            current,
        })
    }

    pub fn current(&self) -> &AppConfig {
        &self.current
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the sources. On any failure the previous configuration stays active.
    pub fn reload(&mut self) -> Result<&AppConfig, ConfigError> {
        match load_config(self.path.as_deref()) {
            Ok(config) => {
                info!(path = ?self.path, "Configuration reloaded");
                self.current = config;
                Ok(&self.current)
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Configuration reload failed, keeping previous");
                Err(e)
            }
        }
    }
}
