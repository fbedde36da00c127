pub mod manager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
pub use manager::ConfigManager;

use crate::constants::defaults;
use crate::errors::ConfigError;

/// Immutable settings of the backup controller, loaded once per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_solr_url")]
    pub solr_url: String,
    #[serde(default = "default_backup_root_dir")]
    pub backup_root_dir: PathBuf,
    #[serde(default = "default_commit_wait")]
    pub commit_wait_seconds: u64,
    // Status polling
    #[serde(default = "default_backup_retry_count")]
    pub backup_retry_count: u32,
    #[serde(default = "default_backup_retry_wait")]
    pub backup_retry_wait_seconds: u64,
    #[serde(default = "default_restore_retry_count")]
    pub restore_retry_count: u32,
    #[serde(default = "default_restore_retry_wait")]
    pub restore_retry_wait_seconds: u64,
    // Restore sweep loop
    #[serde(default = "default_restore_sweep_count")]
    pub restore_sweep_count: u32,
    #[serde(default = "default_restore_sweep_wait")]
    pub restore_sweep_wait_seconds: u64,
    // Archive transfer
    #[serde(default = "default_transfer_retry_count")]
    pub transfer_retry_count: u32,
    #[serde(default = "default_transfer_retry_wait")]
    pub transfer_retry_wait_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Aws,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_aws_cli")]
    pub aws_cli: String,
    pub local_root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            aws_cli: default_aws_cli(),
            local_root: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solr_url: default_solr_url(),
            backup_root_dir: default_backup_root_dir(),
            commit_wait_seconds: default_commit_wait(),
            backup_retry_count: default_backup_retry_count(),
            backup_retry_wait_seconds: default_backup_retry_wait(),
            restore_retry_count: default_restore_retry_count(),
            restore_retry_wait_seconds: default_restore_retry_wait(),
            restore_sweep_count: default_restore_sweep_count(),
            restore_sweep_wait_seconds: default_restore_sweep_wait(),
            transfer_retry_count: default_transfer_retry_count(),
            transfer_retry_wait_seconds: default_transfer_retry_wait(),
            request_timeout_seconds: default_request_timeout(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solr_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "solr_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let counts = [
            ("backup_retry_count", self.backup_retry_count),
            ("restore_retry_count", self.restore_retry_count),
            ("restore_sweep_count", self.restore_sweep_count),
            ("transfer_retry_count", self.transfer_retry_count),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        if self.storage.backend == StorageBackend::Local && self.storage.local_root.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "storage.local_root".to_string(),
                reason: "required for the local storage backend".to_string(),
            });
        }

        Ok(())
    }

    pub fn commit_wait(&self) -> Duration {
        Duration::from_secs(self.commit_wait_seconds)
    }

    pub fn restore_sweep_wait(&self) -> Duration {
        Duration::from_secs(self.restore_sweep_wait_seconds)
    }

    pub fn transfer_retry_wait(&self) -> Duration {
        Duration::from_secs(self.transfer_retry_wait_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_solr_url() -> String {
    defaults::SOLR_URL.to_string()
}

fn default_backup_root_dir() -> PathBuf {
    PathBuf::from(defaults::BACKUP_ROOT_DIR)
}

fn default_commit_wait() -> u64 {
    defaults::COMMIT_WAIT_SECONDS
}

fn default_backup_retry_count() -> u32 {
    defaults::BACKUP_RETRY_COUNT
}

fn default_backup_retry_wait() -> u64 {
    defaults::BACKUP_RETRY_WAIT_SECONDS
}

fn default_restore_retry_count() -> u32 {
    defaults::RESTORE_RETRY_COUNT
}

fn default_restore_retry_wait() -> u64 {
    defaults::RESTORE_RETRY_WAIT_SECONDS
}

fn default_restore_sweep_count() -> u32 {
    defaults::RESTORE_SWEEP_COUNT
}

fn default_restore_sweep_wait() -> u64 {
    defaults::RESTORE_SWEEP_WAIT_SECONDS
}

fn default_transfer_retry_count() -> u32 {
    defaults::TRANSFER_RETRY_COUNT
}

fn default_transfer_retry_wait() -> u64 {
    defaults::TRANSFER_RETRY_WAIT_SECONDS
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECONDS
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Aws
}

fn default_aws_cli() -> String {
    defaults::AWS_CLI.to_string()
}
