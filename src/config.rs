use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::client::DEFAULT_ENDPOINT;
use crate::conversation::DEFAULT_GREETING;

const APP_DIR: &str = "support-chat";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub greeting: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or the default location when `None`.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Fill every unset field with the built-in default.
    pub fn resolved(self) -> Result<Self> {
        Ok(Self {
            endpoint: Some(self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())),
            greeting: Some(self.greeting.unwrap_or_else(|| DEFAULT_GREETING.to_string())),
            log_file: Some(match self.log_file {
                Some(path) => path,
                None => Self::default_log_path()?,
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(DEFAULT_GREETING)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    pub fn default_log_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::config_dir)
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join(APP_DIR).join("support-chat.log"))
    }
}
