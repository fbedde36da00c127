pub mod archive;
pub mod config;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod http;
pub mod scheduler;
pub mod shard;
pub mod storage;

// Re-export commonly used types
pub use config::{Config, ConfigManager, StorageBackend, StorageConfig};
pub use controller::{BackupController, BackupReport, RestoreReport, ShardFailure};
pub use errors::{ManagerError, ManagerResult};
pub use scheduler::{BackupScheduler, CronInterval};
pub use shard::{BackupTimestamp, CoreIdentity, ShardId, ShardRef};
