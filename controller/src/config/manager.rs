use super::Config;
use crate::errors::ConfigError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    /// Loads `<config_dir>/main.toml`, falling back to built-in defaults when
    /// the file does not exist.
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::load_configuration(config_dir.as_ref()).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    /// Returns a copy of the current configuration with the commit wait replaced.
    pub fn with_commit_wait(&self, commit_wait_seconds: u64) -> Arc<Config> {
        let mut config = (*self.current_config).clone();
        config.commit_wait_seconds = commit_wait_seconds;
        Arc::new(config)
    }

    async fn load_configuration(config_dir: &Path) -> Result<Config, ConfigError> {
        let main_config_path: PathBuf = config_dir.join("main.toml");

        let config = if fs::try_exists(&main_config_path).await.unwrap_or(false) {
            debug!("Loading config: {}", main_config_path.display());
            let content = fs::read_to_string(&main_config_path)
                .await
                .map_err(|e| ConfigError::LoadFailed {
                    path: main_config_path.display().to_string(),
                    reason: e.to_string(),
                })?;

            toml::from_str::<Config>(&content).map_err(|e| ConfigError::ParseError {
                reason: format!("{}: {}", main_config_path.display(), e),
            })?
        } else {
            info!(
                "No configuration found at {}, using defaults",
                main_config_path.display()
            );
            Config::default()
        };

        config.validate()?;

        info!(
            "Configuration loaded: solr {} | backup root {} | storage {:?}",
            config.solr_url,
            config.backup_root_dir.display(),
            config.storage.backend
        );

        Ok(config)
    }
}
